//! Chat collaborator boundary.
//!
//! The chat service itself is external. This module defines what crosses the
//! boundary: the dashboard context sent with each message, the channel events,
//! and a lenient parser for the service's replies. Nothing here touches session
//! state; suggested actions come back as values the host may choose to apply.

use crate::error::{DashboardError, Result};
use crate::filter::{FilterChange, FilterState};
use crate::session::Snapshot;
use crate::stats::{CategoryCount, GrowthRate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Domains included in the context sent to the chat service
const CONTEXT_TOP_DOMAINS: usize = 5;

/// Dashboard tab the user is looking at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ActiveView {
    #[default]
    Overview,
    Publications,
    Network,
    Flow,
    Insights,
}

/// Summary metrics for the chat service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMetrics {
    pub total_publications: usize,
    pub filtered_publications: usize,
    /// `live` or `fallback`
    pub data_source: String,
    pub rejected_rows: usize,
    pub top_domains: Vec<CategoryCount>,
    pub growth: GrowthRate,
    pub high_impact_count: usize,
    pub average_quality: Option<f64>,
    pub network_nodes: usize,
    pub network_edges: usize,
}

/// Serialized alongside every outbound chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardContext {
    pub active_view: ActiveView,
    pub filters: FilterState,
    pub metrics: ContextMetrics,
}

impl DashboardContext {
    pub fn from_snapshot(snapshot: &Snapshot, active_view: ActiveView) -> Self {
        let views = &snapshot.views;
        Self {
            active_view,
            filters: views.filters.clone(),
            metrics: ContextMetrics {
                total_publications: snapshot.dataset.publications.len(),
                filtered_publications: views.view.total,
                data_source: snapshot.dataset.source.label().to_string(),
                rejected_rows: snapshot.dataset.report.rejected.len(),
                top_domains: views
                    .stats
                    .by_domain
                    .iter()
                    .take(CONTEXT_TOP_DOMAINS)
                    .cloned()
                    .collect(),
                growth: views.stats.insights.growth.clone(),
                high_impact_count: views.stats.insights.high_impact_count,
                average_quality: views.stats.insights.average_quality,
                network_nodes: views.network.metrics.node_count,
                network_edges: views.network.metrics.edge_count,
            },
        }
    }
}

/// Follow-up action suggested by the chat service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub payload: Value,
}

impl SuggestedAction {
    /// Filter change carried by a `filter` action; `None` for other kinds.
    pub fn filter_change(&self) -> Result<Option<FilterChange>> {
        if self.kind != "filter" {
            return Ok(None);
        }
        serde_json::from_value(self.payload.clone())
            .map(Some)
            .map_err(|e| DashboardError::Validation(format!("invalid filter action: {}", e)))
    }
}

/// Structured reply from the chat service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default, alias = "response", alias = "message")]
    pub text: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub actions: Vec<SuggestedAction>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl ChatResponse {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Events on the bidirectional chat channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum ChannelEvent {
    #[serde(rename = "chat:message")]
    ChatMessage {
        message: String,
        context: DashboardContext,
    },
    #[serde(rename = "context:update")]
    ContextUpdate { context: DashboardContext },
    #[serde(rename = "action:execute")]
    ActionExecute { action: SuggestedAction },
    #[serde(rename = "chat:response")]
    ChatResponse(ChatResponse),
    #[serde(rename = "chat:error")]
    ChatError { message: String },
    #[serde(rename = "context:acknowledged")]
    ContextAcknowledged,
    #[serde(rename = "action:result")]
    ActionResult {
        success: bool,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        data: Option<Value>,
    },
}

impl ChannelEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChatMessage { .. } => "chat:message",
            Self::ContextUpdate { .. } => "context:update",
            Self::ActionExecute { .. } => "action:execute",
            Self::ChatResponse(_) => "chat:response",
            Self::ChatError { .. } => "chat:error",
            Self::ContextAcknowledged => "context:acknowledged",
            Self::ActionResult { .. } => "action:result",
        }
    }

    /// Sent by the dashboard rather than received from the service
    pub fn is_outbound(&self) -> bool {
        matches!(
            self,
            Self::ChatMessage { .. } | Self::ContextUpdate { .. } | Self::ActionExecute { .. }
        )
    }
}

/// Parse a chat service reply, degrading to a text-only response.
///
/// Accepts bare JSON, JSON inside a markdown code block, or JSON embedded in
/// prose. Anything unparseable becomes the response text.
pub fn parse_chat_response(content: &str) -> ChatResponse {
    let json_str = extract_json(content);

    match serde_json::from_str::<ChatResponse>(&json_str) {
        Ok(response)
            if !response.text.is_empty()
                || response.data.is_some()
                || !response.actions.is_empty()
                || !response.suggestions.is_empty() =>
        {
            response
        }
        Ok(_) => ChatResponse::text_only(content.trim()),
        Err(e) => {
            let preview: String = content.chars().take(200).collect();
            info!(
                error = %e,
                content_preview = %preview,
                "Chat reply is not structured - using it as text"
            );
            ChatResponse::text_only(content.trim())
        }
    }
}

/// Extract JSON from a reply (handles markdown code blocks)
fn extract_json(content: &str) -> String {
    let trimmed = content.trim();

    if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() >= 2 {
            let start = if lines[0].starts_with("```") { 1 } else { 0 };
            let end = if lines.last().map(|l| l.trim()) == Some("```") {
                lines.len() - 1
            } else {
                lines.len()
            };
            return lines[start..end].join("\n");
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return trimmed[start..=end].to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineConfig;
    use crate::session::DashboardSession;

    #[test]
    fn test_extract_json_code_block() {
        let input = "```json\n{\"text\": \"hi\"}\n```";
        assert_eq!(extract_json(input), "{\"text\": \"hi\"}");
    }

    #[test]
    fn test_parse_structured_response() {
        let content = r#"Here you go: {"text": "Three studies in 2024", "suggestions": ["Show the network"], "actions": [{"type": "filter", "label": "Only 2024", "payload": {"field": "year", "value": 2024}}]}"#;
        let response = parse_chat_response(content);
        assert_eq!(response.text, "Three studies in 2024");
        assert_eq!(response.suggestions, vec!["Show the network"]);
        assert_eq!(response.actions.len(), 1);
        assert_eq!(
            response.actions[0].filter_change().unwrap(),
            Some(FilterChange::Year(Some(2024)))
        );
    }

    #[test]
    fn test_parse_degrades_to_text() {
        let response = parse_chat_response("  I could not find any studies on that.  ");
        assert_eq!(response, ChatResponse::text_only("I could not find any studies on that."));

        let response = parse_chat_response("{not json}");
        assert_eq!(response.text, "{not json}");
        assert!(response.actions.is_empty());
    }

    #[test]
    fn test_response_alias() {
        let response = parse_chat_response(r#"{"response": "ok"}"#);
        assert_eq!(response.text, "ok");
    }

    #[test]
    fn test_non_filter_action() {
        let action = SuggestedAction {
            kind: "navigate".to_string(),
            label: "Open network".to_string(),
            payload: serde_json::json!({"view": "network"}),
        };
        assert_eq!(action.filter_change().unwrap(), None);

        let bad = SuggestedAction {
            kind: "filter".to_string(),
            label: String::new(),
            payload: serde_json::json!({"field": "colour"}),
        };
        assert!(bad.filter_change().is_err());
    }

    #[test]
    fn test_active_view_cli_names_match_wire_names() {
        use clap::ValueEnum;

        for view in ActiveView::value_variants() {
            let cli_name = view.to_possible_value().map(|v| v.get_name().to_string());
            let wire_name = serde_json::to_value(view).unwrap();
            assert_eq!(cli_name.as_deref(), wire_name.as_str());
        }
        assert_eq!(ActiveView::from_str("Network", true), Ok(ActiveView::Network));
        assert!(ActiveView::from_str("sidebar", true).is_err());
    }

    #[test]
    fn test_channel_event_wire_names() {
        let event = ChannelEvent::ChatError {
            message: "timeout".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "chat:error");
        assert_eq!(json["payload"]["message"], "timeout");
        assert!(!event.is_outbound());

        let ack: ChannelEvent = serde_json::from_str(r#"{"event": "context:acknowledged"}"#).unwrap();
        assert_eq!(ack, ChannelEvent::ContextAcknowledged);
        assert_eq!(ack.name(), "context:acknowledged");
    }

    #[tokio::test]
    async fn test_context_from_snapshot() {
        let session = DashboardSession::open(
            "/nonexistent/pubs.csv",
            PipelineConfig::default().with_reference_year(2025),
        )
        .await;
        let context = DashboardContext::from_snapshot(&session.snapshot(), ActiveView::Network);

        assert_eq!(context.active_view, ActiveView::Network);
        assert_eq!(context.metrics.total_publications, 5);
        assert_eq!(context.metrics.data_source, "fallback");
        assert_eq!(context.metrics.top_domains.len(), 5);

        let event = ChannelEvent::ChatMessage {
            message: "Which domain leads?".to_string(),
            context,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: ChannelEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "chat:message");
        assert!(back.is_outbound());
        assert!(json.contains("\"active_view\":\"network\""));
    }
}
