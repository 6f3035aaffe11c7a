//! Shader source preprocessing.
//!
//! A pass source is read once, with every `#include` expanded in place, into a
//! buffer of tagged lines. Recognized directives (`#pragma name`, `format`,
//! `parameter`, `stage`) are extracted while expanding, and `#line` markers are
//! interleaved so a downstream compiler reports positions in the original files.
//! The per-stage sources are then filtered out of that single buffer.

mod pragma;

pub use pragma::ShaderParameter;

use crate::common::{PixelFormat, ShaderStage};
use crate::error::SourceError;
use crate::loader::{normalize, SourceLoader};
use pragma::{directive, parse_parameter, quoted};
use rustc_hash::FxHashSet;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use twox_hash::XxHash64;

const VERSION_DIRECTIVE: &str = "#version";
const LINE_DIRECTIVE_EXTENSION: &str =
    "#extension GL_GOOGLE_cpp_style_line_directive : require";

/// Which extracted stages a buffered line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Appeared before any `#pragma stage`.
    Common,
    Stage(ShaderStage),
    /// A `#line` marker, kept in every stage.
    Marker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub text: String,
    pub kind: LineKind,
}

/// The fully expanded source of one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandedSource {
    pub lines: Vec<SourceLine>,
}

impl ExpandedSource {
    /// Emits the text belonging to `stage`, in file order.
    pub fn extract(&self, stage: ShaderStage) -> String {
        let mut text = String::new();
        for line in &self.lines {
            let keep = match line.kind {
                LineKind::Common | LineKind::Marker => true,
                LineKind::Stage(tagged) => tagged == stage,
            };
            if keep {
                text.push_str(&line.text);
                text.push('\n');
            }
        }
        text
    }

    pub fn hash(&self) -> u64 {
        let mut hasher = XxHash64::with_seed(0);
        for line in &self.lines {
            hasher.write(line.text.as_bytes());
            hasher.write_u8(b'\n');
        }
        hasher.finish()
    }
}

/// Everything the compiler needs to know about one pass source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAnnotation {
    pub path: PathBuf,
    pub name: Option<String>,
    pub format: Option<PixelFormat>,
    pub parameters: Vec<ShaderParameter>,
    pub vertex: String,
    pub fragment: String,
    pub hash: u64,
}

impl SourceAnnotation {
    pub fn stage(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }
}

/// Load `path` and everything it includes, and extract its directives.
pub fn annotate(
    path: impl AsRef<Path>,
    loader: &dyn SourceLoader,
) -> Result<SourceAnnotation, SourceError> {
    let path = normalize(path.as_ref());
    let text = loader.load(&path).map_err(|source| SourceError::Io {
        path: path.clone(),
        source,
    })?;

    let mut annotator = Annotator {
        loader,
        included: FxHashSet::default(),
        buffer: ExpandedSource::default(),
        stage: None,
        name: None,
        format: None,
        parameters: Vec::new(),
    };
    annotator.included.insert(path.clone());
    annotator.expand(&path, &text, true)?;

    let buffer = annotator.buffer;
    tracing::debug!(
        "expanded {} into {} lines",
        path.display(),
        buffer.lines.len()
    );

    Ok(SourceAnnotation {
        vertex: buffer.extract(ShaderStage::Vertex),
        fragment: buffer.extract(ShaderStage::Fragment),
        hash: buffer.hash(),
        path,
        name: annotator.name,
        format: annotator.format,
        parameters: annotator.parameters,
    })
}

struct Annotator<'a> {
    loader: &'a dyn SourceLoader,
    included: FxHashSet<PathBuf>,
    buffer: ExpandedSource,
    stage: Option<ShaderStage>,
    name: Option<String>,
    format: Option<PixelFormat>,
    parameters: Vec<ShaderParameter>,
}

impl Annotator<'_> {
    fn push(&mut self, text: &str) {
        let kind = match self.stage {
            None => LineKind::Common,
            Some(stage) => LineKind::Stage(stage),
        };
        self.buffer.lines.push(SourceLine {
            text: text.to_owned(),
            kind,
        });
    }

    fn mark(&mut self, line: usize, path: &Path) {
        self.buffer.lines.push(SourceLine {
            text: format!("#line {} \"{}\"", line, path.display()),
            kind: LineKind::Marker,
        });
    }

    fn expand(&mut self, path: &Path, text: &str, root: bool) -> Result<(), SourceError> {
        let mut lines = text.lines().enumerate();

        if root {
            match lines.next() {
                Some((_, version)) if version.starts_with(VERSION_DIRECTIVE) => {
                    self.push(version);
                    self.push(LINE_DIRECTIVE_EXTENSION);
                    self.mark(2, path);
                }
                _ => return Err(SourceError::MissingVersion(path.to_owned())),
            }
        } else {
            self.mark(1, path);
        }

        for (index, line) in lines {
            let number = index + 1;
            let trimmed = line.trim_start();

            if let Some(rest) = directive(trimmed, "#include") {
                let target = quoted(rest).ok_or_else(|| SourceError::IncludeNotFound {
                    path: path.to_owned(),
                    line: number,
                })?;
                let target = normalize(
                    &path.parent().unwrap_or(Path::new("")).join(target),
                );
                if self.included.insert(target.clone()) {
                    let text = self
                        .loader
                        .load(&target)
                        .map_err(|_| SourceError::IncludeFileNotFound(target.clone()))?;
                    self.expand(&target, &text, false)?;
                } else {
                    tracing::debug!("{} was already included", target.display());
                }
                self.mark(number + 1, path);
            } else if let Some(rest) = directive(trimmed, "#pragma name") {
                if self.name.is_some() {
                    return Err(SourceError::DuplicateNamePragma);
                }
                self.name = Some(rest.trim().to_owned());
                self.mark(number + 1, path);
            } else if let Some(rest) = directive(trimmed, "#pragma format") {
                if self.format.is_some() {
                    return Err(SourceError::DuplicateFormatPragma);
                }
                let token = rest.trim();
                let format = token
                    .parse()
                    .map_err(|_| SourceError::InvalidFormatPragma(token.to_owned()))?;
                self.format = Some(format);
                self.mark(number + 1, path);
            } else if let Some(rest) = directive(trimmed, "#pragma parameter") {
                let parameter = parse_parameter(line, rest)?;
                match self
                    .parameters
                    .iter()
                    .find(|declared| declared.name == parameter.name)
                {
                    Some(declared) if *declared != parameter => {
                        return Err(SourceError::DuplicateParameterPragma(parameter.name));
                    }
                    Some(_) => {}
                    None => self.parameters.push(parameter),
                }
                self.push(line);
                self.mark(number + 1, path);
            } else if let Some(rest) = directive(trimmed, "#pragma stage") {
                self.stage = Some(match rest.trim() {
                    "vertex" => ShaderStage::Vertex,
                    "fragment" => ShaderStage::Fragment,
                    other => return Err(SourceError::InvalidStagePragma(other.to_owned())),
                });
                self.mark(number + 1, path);
            } else if directive(trimmed, "#endif").is_some() {
                self.push(line);
                self.mark(number + 1, path);
            } else {
                self.push(line);
            }
        }

        Ok(())
    }
}
