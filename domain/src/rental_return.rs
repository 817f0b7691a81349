//! Location check performed when a member returns a rented asset.
//!
//! The proximity verifier only measures; whether an out-of-range reading blocks
//! the return or merely warns the member is decided here by a [`ReturnPolicy`].

use crate::error::Error;
use crate::location::{verify_coordinates, Coordinate, FixedPointCoordinate, ProximityCheck};
use log::*;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnPolicy {
    /// An out-of-range reading rejects the return.
    #[default]
    Block,
    /// An out-of-range reading is reported but the return proceeds.
    Inform,
}

impl fmt::Display for ReturnPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReturnPolicy::Block => write!(f, "block"),
            ReturnPolicy::Inform => write!(f, "inform"),
        }
    }
}

impl FromStr for ReturnPolicy {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "block" => Ok(ReturnPolicy::Block),
            "inform" => Ok(ReturnPolicy::Inform),
            other => Err(Error::invalid_input(&format!(
                "unknown return policy `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "decision", content = "check", rename_all = "snake_case")]
pub enum ReturnDecision {
    /// No user reading or no reference point; the return is authorized unchecked.
    Skipped,
    Verified(ProximityCheck),
    /// Out of range under [`ReturnPolicy::Inform`].
    Notice(ProximityCheck),
    /// Out of range under [`ReturnPolicy::Block`].
    Rejected(ProximityCheck),
}

impl ReturnDecision {
    /// Whether the return submission may go ahead.
    pub fn is_allowed(&self) -> bool {
        !matches!(self, ReturnDecision::Rejected(_))
    }

    pub fn check(&self) -> Option<&ProximityCheck> {
        match self {
            ReturnDecision::Skipped => None,
            ReturnDecision::Verified(check)
            | ReturnDecision::Notice(check)
            | ReturnDecision::Rejected(check) => Some(check),
        }
    }
}

/// Check the member's reading against the asset's reference point.
///
/// Fails only when the stored reference does not decode to a valid coordinate.
pub fn verify_return_location(
    user: Option<Coordinate>,
    reference: Option<FixedPointCoordinate>,
    policy: ReturnPolicy,
) -> Result<ReturnDecision, Error> {
    let (user, reference) = match (user, reference) {
        (Some(user), Some(reference)) => (user, reference),
        (None, _) => {
            debug!("No device location available, skipping return location check");
            return Ok(ReturnDecision::Skipped);
        }
        (_, None) => {
            debug!("Asset has no reference location, skipping return location check");
            return Ok(ReturnDecision::Skipped);
        }
    };

    let reference = reference.to_degrees()?;
    let check = verify_coordinates(user, reference);

    if check.within_range {
        info!(
            "Return location verified, {:.1} m from the reference point",
            check.distance_meters
        );
        return Ok(ReturnDecision::Verified(check));
    }

    match policy {
        ReturnPolicy::Block => {
            warn!(
                "Rejecting return, {:.1} m from the reference point",
                check.distance_meters
            );
            Ok(ReturnDecision::Rejected(check))
        }
        ReturnPolicy::Inform => {
            info!(
                "Return is {:.1} m from the reference point, proceeding with a notice",
                check.distance_meters
            );
            Ok(ReturnDecision::Notice(check))
        }
    }
}
