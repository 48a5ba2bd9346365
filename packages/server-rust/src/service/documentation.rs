//! Keyword documentation from .NET-style XML documentation files.
//!
//! The file has the shape produced by the C# compiler's `/doc` switch:
//!
//! ```xml
//! <doc>
//!   <members>
//!     <member name="M:RobotFramework.HyperVMgmtLibrary.start_virtual_machine(System.String)">
//!       <summary>...</summary>
//!       <param name="name">...</param>
//!       <returns>...</returns>
//!     </member>
//!   </members>
//! </doc>
//! ```
//!
//! A keyword's entry is the first member whose `name` starts with
//! `M:{library type}.{keyword}`. The file is read once; any problem with it
//! degrades documentation to empty strings and never fails a request.

use std::fmt::Write as _;
use std::path::Path;

use robot_remote_core::xml::{parse_document, XmlElement, XmlError};
use robot_remote_core::STOP_REMOTE_SERVER;
use tracing::{info, warn};

/// Fixed documentation of `stop_remote_server`.
pub const STOP_REMOTE_SERVER_DOC: &str = "Remotely shut down remote server/library w/ Robot Framework keyword.\n\n\
If server is configured to not allow remote shutdown, keyword 'request' is ignored by server.\n\n\
Always returns status of PASS with return value of 1. Output value contains helpful info and may indicate whether remote shut down is allowed or not.";

/// Errors raised while loading a documentation file.
#[derive(Debug, thiserror::Error)]
pub enum DocumentationError {
    #[error("cannot read documentation file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed documentation file: {0}")]
    Xml(#[from] XmlError),
    #[error("documentation root must be <doc>, found <{0}>")]
    UnexpectedRoot(String),
}

// ---------------------------------------------------------------------------
// XmlDocumentation
// ---------------------------------------------------------------------------

/// Documentation of one member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberDoc {
    pub name: String,
    pub summary: Option<String>,
    pub params: Vec<(String, String)>,
    pub returns: Option<String>,
}

/// Parsed documentation file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlDocumentation {
    members: Vec<MemberDoc>,
}

impl XmlDocumentation {
    /// Parses documentation XML.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentationError`] if the text is not well-formed XML or
    /// the root element is not `<doc>`.
    pub fn parse(text: &str) -> Result<Self, DocumentationError> {
        let root = parse_document(text)?;
        if root.name != "doc" {
            return Err(DocumentationError::UnexpectedRoot(root.name));
        }
        let members = root
            .children_named("members")
            .flat_map(|members| members.children_named("member"))
            .filter_map(member_doc)
            .collect();
        Ok(Self { members })
    }

    /// Reads and parses a documentation file.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentationError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, DocumentationError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// First member whose name starts with `prefix`, in document order.
    #[must_use]
    pub fn find(&self, prefix: &str) -> Option<&MemberDoc> {
        self.members.iter().find(|m| m.name.starts_with(prefix))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Members without a `name` attribute are skipped.
fn member_doc(member: &XmlElement) -> Option<MemberDoc> {
    let name = member.attribute("name")?.to_string();
    let summary = member.child("summary").map(normalized_text);
    let params = member
        .children_named("param")
        .map(|p| {
            (
                p.attribute("name").unwrap_or_default().to_string(),
                normalized_text(p),
            )
        })
        .collect();
    let returns = member.child("returns").map(normalized_text);
    Some(MemberDoc {
        name,
        summary,
        params,
        returns,
    })
}

/// Element text with compiler indentation removed: lines are trimmed and
/// blank lines dropped.
fn normalized_text(element: &XmlElement) -> String {
    element
        .text()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// DocumentationResolver
// ---------------------------------------------------------------------------

/// Answers `get_keyword_documentation`.
#[derive(Debug, Clone)]
pub struct DocumentationResolver {
    library_type: String,
    source: Option<XmlDocumentation>,
}

impl DocumentationResolver {
    #[must_use]
    pub fn new(library_type: impl Into<String>, source: Option<XmlDocumentation>) -> Self {
        Self {
            library_type: library_type.into(),
            source,
        }
    }

    /// Loads the documentation file at `path`, if any. Failures are logged
    /// and leave the resolver without a source.
    #[must_use]
    pub fn load(library_type: impl Into<String>, path: Option<&Path>) -> Self {
        let source = path.and_then(|path| match XmlDocumentation::from_file(path) {
            Ok(doc) => {
                info!(path = %path.display(), members = doc.len(), "loaded keyword documentation");
                Some(doc)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "keyword documentation unavailable");
                None
            }
        });
        Self::new(library_type, source)
    }

    #[must_use]
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Documentation text for `keyword`: summary and a blank line, then one
    /// `name: description` line per parameter and a blank line, then
    /// `Returns: ...`. Missing parts contribute nothing.
    #[must_use]
    pub fn describe(&self, keyword: &str) -> String {
        if keyword == STOP_REMOTE_SERVER {
            return STOP_REMOTE_SERVER_DOC.to_string();
        }
        let Some(source) = &self.source else {
            return String::new();
        };
        let prefix = format!("M:{}.{keyword}", self.library_type);
        let Some(member) = source.find(&prefix) else {
            return String::new();
        };

        let mut out = String::new();
        if let Some(summary) = &member.summary {
            let _ = write!(out, "{summary}\n\n");
        }
        if !member.params.is_empty() {
            for (name, description) in &member.params {
                let _ = writeln!(out, "{name}: {description}");
            }
            out.push('\n');
        }
        if let Some(returns) = &member.returns {
            let _ = write!(out, "Returns: {returns}");
        }
        out
    }
}
