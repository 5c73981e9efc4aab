//! Identifier helpers. Every stored record is keyed by a uuid7 encoded as
//! bech32m, with a human readable prefix naming the record kind.

use bech32::Bech32m;
use uuid7::uuid7;

pub const FORM_HRP: &str = "form_";
pub const STUDENT_HRP: &str = "student_";
pub const FACULTY_HRP: &str = "faculty_";
pub const TEMPLATE_HRP: &str = "template_";

// construct a unique record id then encode using bech32m
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encoded = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encoded)
}
