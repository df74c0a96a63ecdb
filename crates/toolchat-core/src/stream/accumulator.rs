//! Tool-call accumulator with a single open slot

use crate::types::{Fragment, ToolCall};

use super::error::{StreamError, StreamResult};

/// What one fragment produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEvent {
    /// Assistant text
    Text(String),
    /// A fully accumulated tool call
    ToolCall(ToolCall),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Idle,
    Open {
        id: String,
        name: Option<String>,
        arguments: String,
        /// Text that arrived after this call started
        held: Vec<String>,
    },
}

impl Slot {
    fn open(id: String) -> Self {
        Slot::Open {
            id,
            name: None,
            arguments: String::new(),
            held: Vec::new(),
        }
    }
}

/// Rebuilds tool calls from interleaved fragments.
///
/// A call starts at its `CallId` and ends at the next `CallId` or at the end
/// of the stream. Argument fragments are concatenated verbatim. Text arriving
/// while no call is open comes out immediately; text arriving while a call is
/// open is held and comes out right after that call, so events keep the
/// relative order of the fragments.
#[derive(Debug, Clone)]
pub struct ToolCallAccumulator {
    slot: Slot,
}

impl Default for ToolCallAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self { slot: Slot::Idle }
    }

    /// Whether a call is currently open
    pub fn is_open(&self) -> bool {
        matches!(self.slot, Slot::Open { .. })
    }

    /// Feed one fragment, returning the events it completes
    pub fn push(&mut self, fragment: Fragment) -> StreamResult<Vec<DecodedEvent>> {
        match fragment {
            Fragment::Content(text) => match &mut self.slot {
                Slot::Idle => Ok(vec![DecodedEvent::Text(text)]),
                Slot::Open { held, .. } => {
                    held.push(text);
                    Ok(Vec::new())
                }
            },

            Fragment::CallId(id) => {
                match std::mem::replace(&mut self.slot, Slot::open(id)) {
                    Slot::Idle => Ok(Vec::new()),
                    Slot::Open {
                        id,
                        name,
                        arguments,
                        held,
                    } => {
                        // A nameless open call is superseded by the new id;
                        // its held text still goes out.
                        let call = name.map(|name| ToolCall { id, name, arguments });
                        Ok(close_events(call, held))
                    }
                }
            }

            Fragment::Name(new_name) => match &mut self.slot {
                Slot::Idle => Err(StreamError::Malformed(format!(
                    "tool name '{}' without a preceding call id",
                    new_name
                ))),
                Slot::Open { name: name @ None, .. } => {
                    *name = Some(new_name);
                    Ok(Vec::new())
                }
                Slot::Open {
                    id,
                    name: Some(existing),
                    ..
                } => {
                    if *existing == new_name {
                        Ok(Vec::new())
                    } else {
                        Err(StreamError::Malformed(format!(
                            "tool call '{}' renamed from '{}' to '{}'",
                            id, existing, new_name
                        )))
                    }
                }
            },

            Fragment::ArgsDelta(delta) => match &mut self.slot {
                Slot::Idle => Err(StreamError::Malformed(
                    "argument fragment without an open tool call".to_string(),
                )),
                Slot::Open { arguments, .. } => {
                    arguments.push_str(&delta);
                    Ok(Vec::new())
                }
            },
        }
    }

    /// Close the stream, emitting the open call and the text held behind it
    pub fn finish(&mut self) -> StreamResult<Vec<DecodedEvent>> {
        match std::mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Idle => Ok(Vec::new()),
            Slot::Open {
                id,
                name: Some(name),
                arguments,
                held,
            } => Ok(close_events(Some(ToolCall { id, name, arguments }), held)),
            Slot::Open { id, name: None, .. } => Err(StreamError::Malformed(format!(
                "stream ended before tool call '{}' had a name",
                id
            ))),
        }
    }
}

fn close_events(call: Option<ToolCall>, held: Vec<String>) -> Vec<DecodedEvent> {
    call.map(DecodedEvent::ToolCall)
        .into_iter()
        .chain(held.into_iter().map(DecodedEvent::Text))
        .collect()
}
