use std::io::{self, Write};

use color_print::cformat;
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::QueueableCommand;

use crate::conversation_state::Role;

/// Marker that toggles strong emphasis in assistant text.
pub const EMPHASIS_MARKER: &str = "**";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Plain(&'a str),
    Strong(&'a str),
}

/// Split `text` on `**`. Every odd-numbered piece is emphasized, so an
/// unmatched marker emphasizes everything after it.
pub fn split_emphasis(text: &str) -> Vec<Segment<'_>> {
    text.split(EMPHASIS_MARKER)
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(index, part)| {
            if index % 2 == 1 {
                Segment::Strong(part)
            } else {
                Segment::Plain(part)
            }
        })
        .collect()
}

/// Write `text` with emphasized segments in bold.
pub fn write_emphasized<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    for segment in split_emphasis(text) {
        match segment {
            Segment::Plain(part) => {
                out.queue(Print(part))?;
            }
            Segment::Strong(part) => {
                out.queue(SetAttribute(Attribute::Bold))?
                    .queue(Print(part))?
                    .queue(SetAttribute(Attribute::Reset))?;
            }
        }
    }
    Ok(())
}

/// Write one labelled transcript entry. Only assistant text gets emphasis
/// markup; user text is echoed verbatim.
pub fn write_message<W: Write>(
    out: &mut W,
    role: Role,
    assistant_label: &str,
    text: &str,
) -> io::Result<()> {
    match role {
        Role::User => {
            write!(out, "{}", cformat!("<bold><green>You:</></> "))?;
            write!(out, "{text}")?;
        }
        Role::Assistant => {
            write!(out, "{}", cformat!("<bold><cyan>{}:</></> ", assistant_label))?;
            write_emphasized(out, text)?;
        }
    }
    writeln!(out)?;
    out.flush()
}
