//! Template codes and the offline package.
//!
//! A template code is the document from [`encode_template`] serialized,
//! gzip-compressed and base64 encoded. The offline artifact packs every
//! code of one compilation into a single versioned document, compressed
//! the same way.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use kindling_ir::Template;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

use crate::encode::{encode_template, WIRE_VERSION};
use crate::error::CodegenResult;

/// gzip + base64 of a JSON document.
pub fn encode_code(document: &Json) -> CodegenResult<String> {
    let raw = serde_json::to_vec(document)?;
    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(&raw)?;
    Ok(STANDARD.encode(gz.finish()?))
}

/// Inverse of [`encode_code`].
pub fn decode_code(code: &str) -> CodegenResult<Json> {
    let compressed = STANDARD.decode(code.trim())?;
    let mut raw = Vec::new();
    GzDecoder::new(compressed.as_slice()).read_to_end(&mut raw)?;
    Ok(serde_json::from_slice(&raw)?)
}

/// One encoded template, named after its header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateCode {
    pub name: String,
    pub code: String,
}

impl TemplateCode {
    pub fn encode(template: &Template) -> CodegenResult<Self> {
        Ok(Self {
            name: template.header.unit_name(),
            code: encode_code(&encode_template(template)?)?,
        })
    }

    /// Chat command that gives the player a template item holding this code.
    pub fn give_command(&self) -> String {
        let data = json!({
            "author": "kindling",
            "name": self.name,
            "version": WIRE_VERSION,
            "code": self.code,
        });
        let display = json!({ "text": self.name });
        format!(
            "/give @p ender_chest{{PublicBukkitValues:{{\"hypercube:codetemplatedata\":'{}'}},display:{{Name:'{}'}}}} 1",
            quote_nbt(&data.to_string()),
            quote_nbt(&display.to_string())
        )
    }
}

/// Escape for a single-quoted NBT string.
fn quote_nbt(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Everything needed to place a compilation by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflinePackage {
    pub version: u32,
    pub templates: Vec<TemplateCode>,
    /// All templates in one compressed document.
    pub artifact: String,
}

impl OfflinePackage {
    pub fn build(templates: &[Template]) -> CodegenResult<Self> {
        let codes = templates
            .iter()
            .map(TemplateCode::encode)
            .collect::<CodegenResult<Vec<_>>>()?;
        Self::from_codes(codes)
    }

    pub fn from_codes(templates: Vec<TemplateCode>) -> CodegenResult<Self> {
        let artifact = encode_code(&json!({
            "version": WIRE_VERSION,
            "templates": templates,
        }))?;
        Ok(Self {
            version: WIRE_VERSION,
            templates,
            artifact,
        })
    }

    /// One give command per template, in delivery order.
    pub fn give_commands(&self) -> Vec<String> {
        self.templates.iter().map(TemplateCode::give_command).collect()
    }
}
