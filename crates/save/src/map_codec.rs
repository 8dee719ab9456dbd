// ---------------------------------------------------------------------------
// map_codec – SaveMap snapshot and the binary map file format
// ---------------------------------------------------------------------------

use std::path::Path;

use bevy::prelude::*;
use network::link_graph::{LinkEdge, LinkGraph};
use network::model::{CurveId, Junction, Road};
use network::reference_curve::{CurveSegment, ReferenceCurve};
use network::{EngineParams, RoadMap};
use serde::{Deserialize, Serialize};

use crate::atomic_write::atomic_write;
use crate::file_header::{read_payload, wrap_with_header, wrap_with_header_compressed};
use crate::save_error::SaveError;

/// Current map schema version.
/// v1 = roads, junctions, reference curves with segment maps, link edges, engine params
pub const CURRENT_SAVE_VERSION: u32 = 1;

/// A reference curve as stored: control points plus its segment map. The
/// arc-length table is rebuilt on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct SaveCurve {
    pub id: CurveId,
    pub points: Vec<[f32; 2]>,
    pub segments: Vec<CurveSegment>,
}

impl SaveCurve {
    fn from_curve(curve: &ReferenceCurve) -> Self {
        Self {
            id: curve.id,
            points: curve.points().iter().map(|p| [p.x, p.y]).collect(),
            segments: curve.segments().to_vec(),
        }
    }

    fn into_curve(self) -> ReferenceCurve {
        let points = self.points.into_iter().map(Vec2::from).collect();
        ReferenceCurve::from_parts(self.id, points, self.segments)
    }
}

/// Everything needed to rebuild a [`RoadMap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct SaveMap {
    pub version: u32,
    pub roads: Vec<Road>,
    pub junctions: Vec<Junction>,
    pub curves: Vec<SaveCurve>,
    pub links: Vec<LinkEdge>,
    pub params: EngineParams,
}

impl SaveMap {
    pub fn from_map(map: &RoadMap) -> Self {
        Self {
            version: CURRENT_SAVE_VERSION,
            roads: map.roads().cloned().collect(),
            junctions: map.junctions().cloned().collect(),
            curves: map.curves().iter().map(SaveCurve::from_curve).collect(),
            links: map.links().edges().map(|(_, edge)| *edge).collect(),
            params: map.params().clone(),
        }
    }

    pub fn into_map(self) -> RoadMap {
        RoadMap::from_parts(
            self.roads,
            self.junctions,
            self.curves.into_iter().map(SaveCurve::into_curve).collect(),
            LinkGraph::from_edges(self.links),
            self.params,
        )
    }

    pub fn encode(&self) -> Vec<u8> {
        bitcode::encode(self)
    }

    /// Decode a payload, rejecting maps written by a newer build.
    pub fn decode(bytes: &[u8]) -> Result<Self, SaveError> {
        let save: SaveMap = bitcode::decode(bytes)?;
        if save.version > CURRENT_SAVE_VERSION {
            return Err(SaveError::VersionMismatch {
                expected_max: CURRENT_SAVE_VERSION,
                found: save.version,
            });
        }
        Ok(save)
    }
}

/// Serialize `map` into a complete map file image.
pub fn encode_map(map: &RoadMap, compress: bool) -> Vec<u8> {
    let payload = SaveMap::from_map(map).encode();
    if compress {
        wrap_with_header_compressed(&payload)
    } else {
        wrap_with_header(&payload)
    }
}

/// Parse a map file image back into a [`RoadMap`].
pub fn decode_map(bytes: &[u8]) -> Result<RoadMap, SaveError> {
    if bytes.is_empty() {
        return Err(SaveError::NoData);
    }
    let (header, payload) = read_payload(bytes)?;
    debug!(
        "Map file header: format v{}, flags {:#X}, timestamp {}, data size {}, checksum {:#010X}",
        header.format_version,
        header.flags,
        header.timestamp,
        header.uncompressed_size,
        header.checksum,
    );
    Ok(SaveMap::decode(&payload)?.into_map())
}

pub fn save_map_to_file(map: &RoadMap, path: &Path, compress: bool) -> Result<usize, SaveError> {
    let bytes = encode_map(map, compress);
    atomic_write(path, &bytes)?;
    Ok(bytes.len())
}

pub fn load_map_from_file(path: &Path) -> Result<RoadMap, SaveError> {
    let bytes = std::fs::read(path)?;
    decode_map(&bytes)
}
