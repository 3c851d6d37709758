use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    service::RequestContext,
    tool, tool_handler, tool_router,
    transport::stdio,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::core::config::{AnalysisConfig, PeerlensConfig};
use crate::core::services::segmentation::segment;
use crate::llm::factory::ExternalServices;
use crate::toolkit::analysis::{AnalysisError, SimilarityAnalyzer};

const CONFIG_URI: &str = "config://peerlens";

#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct AnalyzeSummariesParams {
    #[schemars(description = "Summaries to cross-compare (at least 2 non-blank entries)")]
    pub summaries: Vec<String>,
}

#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct SegmentTextParams {
    #[schemars(description = "Text to split into sentences")]
    pub text: String,
}

#[derive(Clone)]
pub struct PeerlensMcpServer {
    analyzer: Arc<SimilarityAnalyzer>,
    config: Arc<PeerlensConfig>,
    tool_router: ToolRouter<Self>,
}

impl PeerlensMcpServer {
    pub fn new(analyzer: SimilarityAnalyzer, config: PeerlensConfig) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }

    /// Invalid input is the caller's fault; everything else is a server failure.
    fn convert_error(err: AnalysisError) -> McpError {
        let response = err.to_response();
        match err {
            AnalysisError::InvalidInput(_) => McpError::invalid_params(response.error, None),
            AnalysisError::ProviderFatal(_) => {
                McpError::internal_error(response.error.clone(), Some(json!(response)))
            }
            AnalysisError::Internal(detail) => {
                error!("Analysis failed: {}", detail);
                McpError::internal_error(response.error, None)
            }
        }
    }

    fn result_to_json<T: Serialize>(result: T) -> Result<String, McpError> {
        serde_json::to_string_pretty(&result).map_err(|e| McpError::internal_error(e.to_string(), None))
    }
}

#[tool_router]
impl PeerlensMcpServer {
    #[tool(description = "Cross-compare summaries: bidirectional sentence-level similarity for every pair plus a weighted concept graph. Returns: {results, totalSummaries, conceptGraph: {nodes, edges}, conceptsBySummary, diagnostics}")]
    async fn analyze_summaries(
        &self,
        Parameters(params): Parameters<AnalyzeSummariesParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("Analyzing {} summaries", params.summaries.len());

        let result = self
            .analyzer
            .analyze(&params.summaries)
            .await
            .map_err(Self::convert_error)?;

        info!(
            "Analysis {} done: {} pairs, {} concept edges",
            result.diagnostics.analysis_id,
            result.results.len(),
            result.concept_graph.edges.len()
        );

        let json = Self::result_to_json(&result)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Split text into sentences the way the analysis does. Returns: [sentence]")]
    async fn segment_text(
        &self,
        Parameters(params): Parameters<SegmentTextParams>,
    ) -> Result<CallToolResult, McpError> {
        let sentences = segment(&params.text);
        if sentences.is_empty() {
            warn!("segment_text called with blank text");
        }
        let json = Self::result_to_json(&sentences)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

#[tool_handler]
impl ServerHandler for PeerlensMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "peerlens".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Semantic overlap analysis for shared summaries. Use analyze_summaries with the \
                 submitted texts to get pairwise similarity and a concept graph; segment_text shows \
                 how a text is split into sentences."
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: vec![RawResource::new(CONFIG_URI, "peerlens-config".to_string()).no_annotation()],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match uri.as_str() {
            CONFIG_URI => {
                let content = Self::result_to_json(json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "service": self.config.as_ref(),
                    "analysis": self.analyzer.config(),
                    "tools": ["analyze_summaries", "segment_text"],
                }))?;

                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::text(content, uri)],
                })
            }
            _ => Err(McpError::resource_not_found(
                format!("Unknown resource: {}", uri),
                Some(json!({ "uri": uri })),
            )),
        }
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    info!("Initializing peerlens MCP server...");

    let config = PeerlensConfig::from_env();
    config.validate()?;
    let analysis = AnalysisConfig::load(config.analysis_config_path.as_deref())?;
    let services = ExternalServices::from_config(&config)?;
    let analyzer = SimilarityAnalyzer::from_services(&services, analysis);

    info!("peerlens MCP server ready");
    info!("   LLM: {}/{}", config.llm_provider, config.llm_model);
    info!("   Embeddings: {}/{}", config.embedding_provider, config.embedding_model);

    let server = PeerlensMcpServer::new(analyzer, config);
    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
