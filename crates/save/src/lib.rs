//! Map persistence: the binary `.rdnt` format and OpenDRIVE interchange.

mod atomic_write;
pub mod file_header;
pub mod map_codec;
pub mod opendrive;
mod save_error;
mod save_plugin;

pub use map_codec::{
    decode_map, encode_map, load_map_from_file, save_map_to_file, SaveMap, CURRENT_SAVE_VERSION,
};
pub use opendrive::{export_xodr, import_xodr};
pub use save_error::SaveError;
pub use save_plugin::{
    read_map_file, write_map_file, LoadMapEvent, MapFileResult, MapFormat, SaveMapEvent,
    SavePlugin,
};
