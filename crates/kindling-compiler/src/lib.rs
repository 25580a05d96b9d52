//! Kindling compiler: orchestrates the full compilation pipeline.
//!
//! ```text
//! AST → Transpiler → Program → Optimizer(tier) → Templates → Encoder
//!     → offline package | live session
//! ```
//!
//! Parsing happens outside this crate; the pipeline starts from a
//! [`Script`] or its JSON document.

mod config;
mod error;

use kindling_ir::{Program, Template};
use kindling_optimizer::{optimize_for, ScopePromotion};
use kindling_types::ast::Script;
use kindling_types::{Diagnostic, SyntaxError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

pub use config::{CompileConfig, DeliveryMode, ErrorDetail, SessionConfig};
pub use error::CompileError;
pub use kindling_codegen::{LiveSession, OfflinePackage, Progress, TemplateCode};
pub use kindling_optimizer::PlotTier;

// ══════════════════════════════════════════════════════════════════════════════
// Pipeline
// ══════════════════════════════════════════════════════════════════════════════

/// Everything one compilation produced, in delivery order.
#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
    /// The program before fitting.
    pub program: Program,
    pub templates: Vec<Template>,
    pub promotions: Vec<ScopePromotion>,
    pub package: OfflinePackage,
}

impl Compilation {
    pub fn codes(&self) -> &[TemplateCode] {
        &self.package.templates
    }

    /// SHA-256 of each template code, hex encoded.
    pub fn digests(&self) -> Vec<String> {
        self.codes().iter().map(|c| digest(&c.code)).collect()
    }

    /// Human-readable listing of every template.
    pub fn listing(&self) -> String {
        self.templates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Compile `script` for the plot tier in `config`.
pub fn compile(script: &Script, config: &CompileConfig) -> Result<Compilation, CompileError> {
    let program = kindling_transpiler::transpile(script)?;
    debug!(units = program.units.len(), "transpiled");

    let optimized = optimize_for(&program, config.tier)?;
    debug!(
        templates = optimized.templates.len(),
        tier = %config.tier,
        "optimized"
    );
    for promo in &optimized.promotions {
        warn!(
            unit = %promo.unit,
            variable = %promo.variable,
            "line variable spans several templates; promoted to game scope"
        );
    }

    let package = OfflinePackage::build(&optimized.templates)?;
    debug!(bytes = package.artifact.len(), "encoded");
    info!(
        templates = package.templates.len(),
        tier = %config.tier,
        "compiled"
    );

    Ok(Compilation {
        program,
        templates: optimized.templates,
        promotions: optimized.promotions,
        package,
    })
}

/// Read the parser's JSON output: a script, or `{"syntax_error": {..}}`.
pub fn parse_ast(json: &str) -> Result<Script, CompileError> {
    let mut document: serde_json::Value = serde_json::from_str(json)?;
    if let Some(report) = document.get_mut("syntax_error") {
        let err: SyntaxError = serde_json::from_value(report.take())?;
        return Err(err.into());
    }
    Ok(serde_json::from_value(document)?)
}

/// [`parse_ast`] then [`compile`].
pub fn compile_ast_json(json: &str, config: &CompileConfig) -> Result<Compilation, CompileError> {
    compile(&parse_ast(json)?, config)
}

/// Send the compiled templates to the companion client.
pub async fn deliver_live(
    codes: &[TemplateCode],
    session: &SessionConfig,
) -> Result<Progress, CompileError> {
    let mut live = LiveSession::connect(&session.address, session.ack_timeout()).await?;
    Ok(live.deliver(codes).await?)
}

/// Hex SHA-256 of `code`.
pub fn digest(code: &str) -> String {
    Sha256::digest(code.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

// ══════════════════════════════════════════════════════════════════════════════
// Structured Result
// ══════════════════════════════════════════════════════════════════════════════

/// Serializable outcome of a compilation, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileResult {
    pub success: bool,
    pub tier: PlotTier,
    pub templates: Vec<TemplateCode>,
    /// SHA-256 per entry of `templates`.
    pub digests: Vec<String>,
    pub promotions: Vec<ScopePromotion>,
    /// Combined offline artifact.
    pub artifact: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileResult {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Compile an AST document, never failing: errors land in `diagnostics`.
pub fn compile_to_result(json: &str, config: &CompileConfig) -> CompileResult {
    match compile_ast_json(json, config) {
        Ok(compilation) => CompileResult {
            success: true,
            tier: config.tier,
            digests: compilation.digests(),
            templates: compilation.package.templates,
            promotions: compilation.promotions,
            artifact: Some(compilation.package.artifact),
            diagnostics: Vec::new(),
        },
        Err(err) => CompileResult {
            success: false,
            tier: config.tier,
            templates: Vec::new(),
            digests: Vec::new(),
            promotions: Vec::new(),
            artifact: None,
            diagnostics: vec![err.to_diagnostic()],
        },
    }
}
