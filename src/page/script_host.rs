// src/page/script_host.rs

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AdError;
use crate::model::slot::SlotPosition;
use crate::page::dom::{Document, NodeId};
use crate::page::markup::parse_fragment;

static SCRIPT_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?script\b[^>]*>").expect("script tag pattern"));

static SCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("script block pattern")
});

/// 去掉创意外层的 `<script>` 标签，得到可执行的脚本正文
pub fn strip_script_tags(payload: &str) -> String {
    SCRIPT_TAG.replace_all(payload, "").into_owned()
}

/// Markup an executed script writes into the document, `delay_ms` after it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptWrite {
    pub delay_ms: u64,
    pub markup: String,
}

impl ScriptWrite {
    pub fn immediate(markup: &str) -> Self {
        Self {
            delay_ms: 0,
            markup: markup.to_string(),
        }
    }

    pub fn after(delay_ms: u64, markup: &str) -> Self {
        Self {
            delay_ms,
            markup: markup.to_string(),
        }
    }
}

/// Executes injected creative scripts.
///
/// Third-party ad scripts are opaque: the host only reports what they write
/// and when. `payload` is the creative as configured, `<script>` blocks and
/// any inline markup included. An `Err` is a load/parse failure of the
/// injected tag.
pub trait ScriptHost {
    fn execute(&mut self, position: SlotPosition, payload: &str) -> Result<Vec<ScriptWrite>, AdError>;
}

/// Renders whatever HTML a creative carries outside of `<script>` blocks.
/// Pure-script creatives write nothing.
#[derive(Debug, Clone, Default)]
pub struct MarkupScriptHost {
    pub write_delay_ms: u64,
}

impl ScriptHost for MarkupScriptHost {
    fn execute(&mut self, _position: SlotPosition, payload: &str) -> Result<Vec<ScriptWrite>, AdError> {
        let markup = SCRIPT_BLOCK.replace_all(payload, "");
        let markup = markup.trim();
        if markup.is_empty() || !markup.contains('<') {
            return Ok(Vec::new());
        }
        Ok(vec![ScriptWrite::after(self.write_delay_ms, markup)])
    }
}

/// Writes script output next to the script element, the way `document.write`
/// or an `insertBefore(currentScript)` loader would. Output of a script that
/// has already been removed lands at the end of `<body>`.
pub fn apply_write(doc: &mut Document, script: NodeId, markup: &str) -> usize {
    let nodes = parse_fragment(doc, markup);
    let count = nodes.len();
    match doc.parent(script) {
        Some(parent) => {
            for node in nodes {
                doc.insert_before(parent, node, script);
            }
        }
        None => {
            let body = doc.body();
            for node in nodes {
                doc.append_child(body, node);
            }
        }
    }
    count
}
