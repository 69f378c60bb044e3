use crate::api::models::ToolCallDelta;
use crate::models::{FunctionCall, ToolCall};
use std::collections::BTreeMap;

/// Reassembles complete tool calls from the indexed fragments a stream
/// delivers. Fragments for one index may interleave with other indexes
/// and arrive out of index order; the index itself is stable per call.
#[derive(Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<u32, ToolCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one fragment. The id may be (re)sent on a late fragment and
    /// overwrites; the name is set once; arguments always append.
    pub fn apply(&mut self, fragment: &ToolCallDelta) {
        let call = self.calls.entry(fragment.index).or_insert_with(|| ToolCall {
            id: String::new(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: String::new(),
                arguments: String::new(),
            },
        });

        if let Some(id) = fragment.id.as_deref() {
            if !id.is_empty() {
                call.id = id.to_string();
            }
        }
        if let Some(call_type) = fragment.call_type.as_deref() {
            if !call_type.is_empty() {
                call.call_type = call_type.to_string();
            }
        }
        if let Some(function) = &fragment.function {
            if let Some(name) = function.name.as_deref() {
                if call.function.name.is_empty() {
                    call.function.name = name.to_string();
                }
            }
            if let Some(arguments) = function.arguments.as_deref() {
                call.function.arguments.push_str(arguments);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// The completed calls, compacted in index order. An index that never
    /// received an id is still emitted, with an empty id.
    pub fn into_calls(self) -> Vec<ToolCall> {
        self.calls.into_values().collect()
    }
}
