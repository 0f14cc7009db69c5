use serde_json::Value;

use crate::models::StepResult;
use crate::tools::{ToolKind, ToolOutput, WeatherReport};

/// Tools whose payload can be attached to an assistant turn, highest priority
/// first.
pub const DISPLAY_TOOLS: [ToolKind; 3] = [
    ToolKind::Weather,
    ToolKind::RepoDetails,
    ToolKind::ListUserRepositories,
];

/// Raw `output` of the first step (by position) declaring `tool`.
///
/// Later steps with the same tool id are ignored. A missing result list, an
/// empty one, or a first match without `output` all yield `None`; the later
/// duplicates are not consulted in that case either.
pub fn find_tool_output<'a>(
    results: Option<&'a [StepResult]>,
    tool: &ToolKind,
) -> Option<&'a Value> {
    results?
        .iter()
        .find(|result| ToolKind::from_id(&result.step.tool) == *tool)
        .and_then(StepResult::output)
}

/// Decoded output of the first step declaring `tool`.
pub fn extract_tool_output(
    results: Option<&[StepResult]>,
    tool: &ToolKind,
) -> Option<ToolOutput> {
    find_tool_output(results, tool).map(|raw| ToolOutput::decode(tool.clone(), raw))
}

pub fn extract_weather(results: Option<&[StepResult]>) -> Option<WeatherReport> {
    match extract_tool_output(results, &ToolKind::Weather)? {
        ToolOutput::Weather(report) => Some(report),
        _ => None,
    }
}

/// The structured payload attached to an assistant turn: the first renderable
/// output among [`DISPLAY_TOOLS`].
pub fn extract_turn_payload(results: Option<&[StepResult]>) -> Option<ToolOutput> {
    DISPLAY_TOOLS
        .iter()
        .filter_map(|tool| extract_tool_output(results, tool))
        .find(ToolOutput::is_renderable)
}
