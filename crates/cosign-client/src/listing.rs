//! Text rendering of store listings

use cosign_coordinator::{Listing, VersionContents};
use cosign_types::TxVersion;
use std::fmt::Write;

const SEPARATOR: &str = "---------------------------------";

fn state(contents: &VersionContents) -> &'static str {
    match (contents.has_payload, contents.has_metadata) {
        (true, true) => "ready",
        (true, false) => "missing signdata",
        (false, true) => "missing unsigned",
        (false, false) => "signatures only",
    }
}

/// One line per version: `chain/key/index  state  signatures: n (a, b)`
pub(crate) fn render_version(version: &TxVersion, contents: &VersionContents) -> String {
    let mut line = format!(
        "{version}  {}  signatures: {}",
        state(contents),
        contents.signature_count()
    );
    if !contents.signers.is_empty() {
        let _ = write!(line, " ({})", contents.signers.join(", "));
    }
    line
}

/// Every version grouped by chain/key, then keys that fit no version
pub(crate) fn render_listing(listing: &Listing) -> String {
    let mut out = String::new();
    let mut last_key = None;
    out.push_str(SEPARATOR);
    out.push('\n');
    for (version, contents) in &listing.versions {
        if last_key.is_some_and(|key| key != version.key()) {
            out.push_str(SEPARATOR);
            out.push('\n');
        }
        out.push_str(&render_version(version, contents));
        out.push('\n');
        last_key = Some(version.key());
    }
    out.push_str(SEPARATOR);
    out.push('\n');
    if !listing.unrecognized.is_empty() {
        out.push_str("unrecognized:\n");
        for object in &listing.unrecognized {
            let _ = writeln!(out, "  {object}");
        }
    }
    out
}
