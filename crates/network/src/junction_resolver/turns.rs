use crate::engine_params::EngineParams;
use crate::model::{Lane, TurnType};
use crate::reference_curve::wrap_angle;

/// Classify a movement from the heading of travel into the junction to the
/// heading of travel out of it. Positive angular difference turns left.
pub fn classify_turn(in_heading: f32, out_heading: f32, params: &EngineParams) -> TurnType {
    let delta = wrap_angle(out_heading - in_heading);
    if delta.abs() <= params.straight_threshold_rad() {
        TurnType::Straight
    } else if delta.abs() >= params.u_turn_threshold_rad() {
        TurnType::UTurn
    } else if delta > 0.0 {
        TurnType::Left
    } else {
        TurnType::Right
    }
}

/// Entry/exit lane pairs carried by a drivable movement. Both lists are
/// ordered innermost first.
pub(crate) fn pair_lanes<'a>(
    turn: TurnType,
    entries: &[&'a Lane],
    exits: &[&'a Lane],
) -> Vec<(&'a Lane, &'a Lane)> {
    match turn {
        TurnType::Straight => entries
            .iter()
            .zip(exits.iter())
            .map(|(a, b)| (*a, *b))
            .collect(),
        TurnType::Left | TurnType::UTurn => entries
            .first()
            .zip(exits.first())
            .map(|(a, b)| vec![(*a, *b)])
            .unwrap_or_default(),
        TurnType::Right => entries
            .last()
            .zip(exits.last())
            .map(|(a, b)| vec![(*a, *b)])
            .unwrap_or_default(),
    }
}
