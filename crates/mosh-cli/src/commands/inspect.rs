//! Inspect: list frame types without modifying anything.

use mosh_core::error::{MoshError, Result};
use mosh_formats::open_container;
use std::path::Path;

pub fn run(input: &Path, format: &str) -> Result<u8> {
    let (container, index) = open_container(input)?;

    match format {
        "json" => {
            let rendered = serde_json::to_string_pretty(&index)
                .map_err(|e| MoshError::Io(std::io::Error::other(e)))?;
            println!("{rendered}");
        }
        "text" => {
            println!(
                "{}: {} ({} frames)",
                input.display(),
                container.kind.name(),
                index.len()
            );
            println!("{:>6}  {:<5}  {:>10}  {:>8}", "index", "type", "offset", "size");
            for frame in &index {
                println!(
                    "{:>6}  {:<5}  {:>10}  {:>8}",
                    frame.decoding_index,
                    frame.frame_type.as_str(),
                    frame.byte_offset,
                    frame.byte_length
                );
            }
            let intra = index.intra_count();
            println!("{intra} keyframe(s), {} predicted/other", index.len() - intra);
        }
        other => {
            return Err(MoshError::Io(std::io::Error::other(format!(
                "unknown inspect format: {other}"
            ))));
        }
    }

    Ok(0)
}
