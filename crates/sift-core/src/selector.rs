//! Discovery selectors and the discovery request that carries them.
//!
//! A [`Selector`] is pure input: it names what the caller wants discovered
//! and holds no resolution state. Selectors have a compact text form used by
//! the CLI:
//!
//! | Form | Selector |
//! |------|----------|
//! | `container:<name>` | [`Selector::ByContainer`] |
//! | `member:<container>#<signature>` | [`Selector::ByMember`] |
//! | `path:<grouping>[@<base>]` | [`Selector::ByGroupingPath`] |
//! | `root:<location>` | [`Selector::ByRootLocation`] |
//! | `id:<identifier>` | [`Selector::ByIdentifier`] |

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::identifier::{Identifier, IdentifierError};

// ============================================================================
// Errors
// ============================================================================

/// Errors produced while parsing selectors or member signatures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// Selector text does not follow any known form.
    #[error("malformed selector '{input}': {reason}")]
    MalformedSelector { input: String, reason: String },

    /// Member signature is not of the form `name(Type, ...)`.
    #[error("malformed member signature '{signature}': {reason}")]
    MalformedSignature { signature: String, reason: String },

    /// The identifier inside an `id:` selector does not parse.
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
}

impl SelectorError {
    fn malformed(input: &str, reason: impl Into<String>) -> Self {
        SelectorError::MalformedSelector {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    fn signature(signature: &str, reason: impl Into<String>) -> Self {
        SelectorError::MalformedSignature {
            signature: signature.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Member Signature
// ============================================================================

static SIGNATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([^()]*)\(([^()]*)\)\s*$").expect("signature regex is valid")
});

/// A member name plus its ordered parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberSignature {
    /// Member name.
    pub name: String,
    /// Parameter type names, in declaration order.
    pub parameter_types: Vec<String>,
}

impl MemberSignature {
    /// Create a signature from a name and parameter types.
    pub fn new<I, S>(name: impl Into<String>, parameter_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MemberSignature {
            name: name.into(),
            parameter_types: parameter_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the strict `name(Type1, Type2)` form used in identifier segments.
    ///
    /// Parentheses are mandatory and the name must not be blank.
    pub fn parse(signature: &str) -> Result<MemberSignature, SelectorError> {
        let caps = SIGNATURE_RE.captures(signature).ok_or_else(|| {
            SelectorError::signature(signature, "expected 'name(Type, ...)'")
        })?;
        let name = caps[1].trim();
        if name.is_empty() {
            return Err(SelectorError::signature(signature, "member name is blank"));
        }
        let params = caps[2].trim();
        let parameter_types = if params.is_empty() {
            Vec::new()
        } else {
            let types: Vec<String> = params.split(',').map(|p| p.trim().to_string()).collect();
            if types.iter().any(String::is_empty) {
                return Err(SelectorError::signature(signature, "blank parameter type"));
            }
            types
        };
        Ok(MemberSignature {
            name: name.to_string(),
            parameter_types,
        })
    }

    /// Parse a member selector: either the strict form or a bare name meaning
    /// zero parameters.
    pub fn parse_selector(text: &str) -> Result<MemberSignature, SelectorError> {
        if text.contains('(') || text.contains(')') {
            return MemberSignature::parse(text);
        }
        let name = text.trim();
        if name.is_empty() {
            return Err(SelectorError::signature(text, "member name is blank"));
        }
        Ok(MemberSignature::new(name, Vec::<String>::new()))
    }
}

impl fmt::Display for MemberSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.parameter_types.join(", "))
    }
}

// ============================================================================
// Selector
// ============================================================================

/// One discovery criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Every test-bearing member of a named container.
    ByContainer { name: String },
    /// One member of a container. `member` is the raw signature text and is
    /// validated during resolution.
    ByMember { container: String, member: String },
    /// Every container whose grouping path equals or lies under `path`,
    /// optionally restricted to one root location.
    ByGroupingPath {
        path: String,
        base: Option<PathBuf>,
    },
    /// Every top-level container found in a root location.
    ByRootLocation { location: PathBuf },
    /// A node (or runtime-only descendant) named by its stable identifier.
    ByIdentifier { id: Identifier },
}

impl Selector {
    /// Select a container by name.
    pub fn container(name: impl Into<String>) -> Self {
        Selector::ByContainer { name: name.into() }
    }

    /// Select one member of a container.
    pub fn member(container: impl Into<String>, member: impl Into<String>) -> Self {
        Selector::ByMember {
            container: container.into(),
            member: member.into(),
        }
    }

    /// Select by grouping path.
    pub fn grouping_path(path: impl Into<String>) -> Self {
        Selector::ByGroupingPath {
            path: path.into(),
            base: None,
        }
    }

    /// Select by root location.
    pub fn root_location(location: impl Into<PathBuf>) -> Self {
        Selector::ByRootLocation {
            location: location.into(),
        }
    }

    /// Select by identifier.
    pub fn identifier(id: Identifier) -> Self {
        Selector::ByIdentifier { id }
    }

    /// Short name of the selector kind, the `selector` field of log records.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Selector::ByContainer { .. } => "container",
            Selector::ByMember { .. } => "member",
            Selector::ByGroupingPath { .. } => "path",
            Selector::ByRootLocation { .. } => "root",
            Selector::ByIdentifier { .. } => "id",
        }
    }

    /// Parse the text form described in the module documentation.
    pub fn parse(input: &str) -> Result<Selector, SelectorError> {
        let Some((kind, body)) = input.split_once(':') else {
            return Err(SelectorError::malformed(input, "missing '<kind>:' prefix"));
        };
        match kind.trim() {
            "container" => {
                let name = body.trim();
                if name.is_empty() {
                    return Err(SelectorError::malformed(input, "container name is blank"));
                }
                Ok(Selector::container(name))
            }
            "member" => {
                let Some((container, member)) = body.split_once('#') else {
                    return Err(SelectorError::malformed(
                        input,
                        "expected 'member:<container>#<signature>'",
                    ));
                };
                let container = container.trim();
                if container.is_empty() {
                    return Err(SelectorError::malformed(input, "container name is blank"));
                }
                Ok(Selector::member(container, member.trim()))
            }
            "path" => {
                let (path, base) = match body.split_once('@') {
                    Some((path, base)) if !base.trim().is_empty() => {
                        (path.trim(), Some(PathBuf::from(base.trim())))
                    }
                    Some(_) => {
                        return Err(SelectorError::malformed(input, "base location is blank"))
                    }
                    None => (body.trim(), None),
                };
                Ok(Selector::ByGroupingPath {
                    path: path.to_string(),
                    base,
                })
            }
            "root" => {
                let location = body.trim();
                if location.is_empty() {
                    return Err(SelectorError::malformed(input, "root location is blank"));
                }
                Ok(Selector::root_location(location))
            }
            "id" => Ok(Selector::identifier(Identifier::parse(body.trim())?)),
            other => Err(SelectorError::malformed(
                input,
                format!("unknown selector kind '{other}'"),
            )),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::ByContainer { name } => write!(f, "container:{name}"),
            Selector::ByMember { container, member } => write!(f, "member:{container}#{member}"),
            Selector::ByGroupingPath { path, base: None } => write!(f, "path:{path}"),
            Selector::ByGroupingPath {
                path,
                base: Some(base),
            } => write!(f, "path:{path}@{}", base.display()),
            Selector::ByRootLocation { location } => write!(f, "root:{}", location.display()),
            Selector::ByIdentifier { id } => write!(f, "id:{id}"),
        }
    }
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

// ============================================================================
// Discovery Request
// ============================================================================

/// Selector text that could not be parsed into a [`Selector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedSelector {
    /// The raw text as supplied.
    pub input: String,
    /// Why it was rejected.
    pub error: SelectorError,
}

/// Ordered, possibly duplicated collection of selectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryRequest {
    selectors: Vec<Selector>,
    rejected: Vec<RejectedSelector>,
}

impl DiscoveryRequest {
    /// Start building a request.
    pub fn builder() -> DiscoveryRequestBuilder {
        DiscoveryRequestBuilder::default()
    }

    /// Request holding exactly the given selectors.
    pub fn of(selectors: impl IntoIterator<Item = Selector>) -> Self {
        DiscoveryRequest::builder().selectors(selectors).build()
    }

    /// Selectors in the order received.
    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    /// Selector text rejected while building the request.
    pub fn rejected(&self) -> &[RejectedSelector] {
        &self.rejected
    }
}

/// Builder for [`DiscoveryRequest`].
///
/// Parse failures never abort the build; they are kept on the request and
/// surface later as resolution issues.
#[derive(Debug, Default)]
pub struct DiscoveryRequestBuilder {
    selectors: Vec<Selector>,
    rejected: Vec<RejectedSelector>,
}

impl DiscoveryRequestBuilder {
    /// Add one selector.
    pub fn selector(mut self, selector: Selector) -> Self {
        self.selectors.push(selector);
        self
    }

    /// Add several selectors, preserving their order.
    pub fn selectors(mut self, selectors: impl IntoIterator<Item = Selector>) -> Self {
        self.selectors.extend(selectors);
        self
    }

    /// Parse and add a selector in text form.
    pub fn parse_selector(mut self, input: &str) -> Self {
        match Selector::parse(input) {
            Ok(selector) => self.selectors.push(selector),
            Err(error) => self.rejected.push(RejectedSelector {
                input: input.to_string(),
                error,
            }),
        }
        self
    }

    /// Finish the request.
    pub fn build(self) -> DiscoveryRequest {
        DiscoveryRequest {
            selectors: self.selectors,
            rejected: self.rejected,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod signatures {
        use super::*;

        #[test]
        fn parses_name_and_parameters() {
            let sig = MemberSignature::parse("test7(java.lang.String, int)").unwrap();
            assert_eq!(sig.name, "test7");
            assert_eq!(sig.parameter_types, vec!["java.lang.String", "int"]);
            assert_eq!(sig.to_string(), "test7(java.lang.String, int)");
        }

        #[test]
        fn empty_parameter_list() {
            let sig = MemberSignature::parse("test1()").unwrap();
            assert!(sig.parameter_types.is_empty());
            assert_eq!(sig.to_string(), "test1()");
        }

        #[test]
        fn missing_parentheses_is_malformed() {
            let err = MemberSignature::parse("methodName").unwrap_err();
            assert!(matches!(err, SelectorError::MalformedSignature { .. }));
        }

        #[test]
        fn blank_name_is_malformed() {
            assert!(MemberSignature::parse("()").is_err());
            assert!(MemberSignature::parse("  (int)").is_err());
        }

        #[test]
        fn blank_parameter_is_malformed() {
            assert!(MemberSignature::parse("m(int,)").is_err());
        }

        #[test]
        fn selector_form_allows_bare_name() {
            let sig = MemberSignature::parse_selector("test2").unwrap();
            assert_eq!(sig, MemberSignature::new("test2", Vec::<String>::new()));
            assert!(MemberSignature::parse_selector("   ").is_err());
            assert!(MemberSignature::parse_selector("()").is_err());
        }
    }

    mod text_form {
        use super::*;

        #[test]
        fn parses_each_kind() {
            assert_eq!(
                Selector::parse("container:a.MyTestClass").unwrap(),
                Selector::container("a.MyTestClass")
            );
            assert_eq!(
                Selector::parse("member:a.MyTestClass#test1()").unwrap(),
                Selector::member("a.MyTestClass", "test1()")
            );
            assert_eq!(
                Selector::parse("path:a.b@build/classes").unwrap(),
                Selector::ByGroupingPath {
                    path: "a.b".to_string(),
                    base: Some(PathBuf::from("build/classes")),
                }
            );
            assert_eq!(
                Selector::parse("root:build/classes").unwrap(),
                Selector::root_location("build/classes")
            );
            let id = Selector::parse("id:[engine:sift][class:X]").unwrap();
            assert_eq!(id.kind_name(), "id");
        }

        #[test]
        fn empty_grouping_path_is_allowed() {
            assert_eq!(
                Selector::parse("path:").unwrap(),
                Selector::grouping_path("")
            );
        }

        #[test]
        fn display_round_trips() {
            for text in [
                "container:a.B",
                "member:a.B#m(int)",
                "path:a.b",
                "path:a@lib",
                "root:lib",
                "id:[engine:sift][class:a.B]",
            ] {
                assert_eq!(Selector::parse(text).unwrap().to_string(), text);
            }
        }

        #[test]
        fn unknown_kind_is_malformed() {
            let err = Selector::parse("package:a.b").unwrap_err();
            assert!(err.to_string().contains("unknown selector kind 'package'"));
            assert!(Selector::parse("no-prefix").is_err());
            assert!(Selector::parse("member:a.B").is_err());
        }

        #[test]
        fn bad_identifier_is_identifier_error() {
            let err = Selector::parse("id:engine:sift").unwrap_err();
            assert!(matches!(err, SelectorError::Identifier(_)));
        }
    }

    mod request {
        use super::*;

        #[test]
        fn builder_keeps_order_and_rejections() {
            let request = DiscoveryRequest::builder()
                .parse_selector("container:a.B")
                .parse_selector("bogus")
                .selector(Selector::container("a.C"))
                .parse_selector("container:a.B")
                .build();
            let names: Vec<_> = request.selectors().iter().map(|s| s.to_string()).collect();
            assert_eq!(names, vec!["container:a.B", "container:a.C", "container:a.B"]);
            assert_eq!(request.rejected().len(), 1);
            assert_eq!(request.rejected()[0].input, "bogus");
        }
    }
}
