use crate::error::ArchError;

/// A logical node from the architecture diagram (`spec.md` §3's `DiagramNode`).
///
/// `fs_ids` starts empty and is filled in by [`crate::diagram::binder::bind`].
#[derive(Debug, Clone)]
pub struct DiagramNode {
    pub id: u32,
    pub kind: NodeKind,
    pub name: Option<String>,
    pub variable: Option<String>,
    pub stereotype: Option<String>,
    pub children: Vec<DiagramNode>,
    pub fs_ids: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Synthetic ancestor of every top-level node, so every user node has a parent.
    Root,
    Package,
    Component,
}

/// A directed, normalized dependency between two diagram variables
/// (`spec.md` §3's `DiagramRelationship`). `src` always names the user of the
/// dependency, `dst` the used side, regardless of which way the arrow was
/// drawn in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramRelationship {
    pub src: String,
    pub dst: String,
}

/// A generic parse-tree node, the "shim" the typed builder walks (`spec.md`
/// §4.B's contract: the core consumes a parse tree produced by an external,
/// out-of-scope grammar). `label` is one of `"package"`, `"component"`,
/// `"relationship"`, or an unrecognized string (fatal at build time).
#[derive(Debug, Clone)]
struct ParseNode {
    label: String,
    props: Vec<(String, String)>,
    children: Vec<ParseNode>,
}

impl ParseNode {
    fn prop(&self, key: &str) -> Option<&str> {
        self.props
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Tokenize and parse diagram source text into the typed root node and its
/// flattened relationship list (`spec.md` §4.B's `parse(file) -> (root,
/// relationships)`).
pub fn parse(text: &str) -> Result<(DiagramNode, Vec<DiagramRelationship>), ArchError> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('\'') && *l != "@startuml" && *l != "@enduml")
        .collect();

    let mut cursor = 0usize;
    let top_level = parse_block(&lines, &mut cursor)?;
    if cursor != lines.len() {
        return Err(ArchError::GrammarUnknown(format!(
            "unmatched closing brace near {:?}",
            lines.get(cursor)
        )));
    }

    let root_tree = ParseNode {
        label: "root".to_string(),
        props: Vec::new(),
        children: top_level,
    };

    let mut next_id = 0u32;
    build_model(&root_tree, &mut next_id)
}

/// Parses lines from `*cursor` up to (not including) a bare `}` or end of
/// input, advancing `*cursor` past whatever it consumes.
fn parse_block(lines: &[&str], cursor: &mut usize) -> Result<Vec<ParseNode>, ArchError> {
    let mut nodes = Vec::new();

    while *cursor < lines.len() {
        let line = lines[*cursor];
        if line == "}" {
            *cursor += 1;
            return Ok(nodes);
        }

        if let Some(node) = parse_container_line(line)? {
            *cursor += 1;
            let has_block = line.ends_with('{');
            let children = if has_block {
                parse_block(lines, cursor)?
            } else {
                Vec::new()
            };
            nodes.push(ParseNode {
                children,
                ..node
            });
            continue;
        }

        if let Some(node) = parse_relationship_line(line)? {
            nodes.push(node);
            *cursor += 1;
            continue;
        }

        return Err(ArchError::GrammarUnknown(line.to_string()));
    }

    Ok(nodes)
}

/// Parses a `package`/`component` declaration line:
/// `package "Name" as var1 {` or `component "Other" as var3 <<stereotype>>`.
fn parse_container_line(line: &str) -> Result<Option<ParseNode>, ArchError> {
    let (label, rest) = if let Some(rest) = line.strip_prefix("package") {
        ("package", rest)
    } else if let Some(rest) = line.strip_prefix("component") {
        ("component", rest)
    } else {
        return Ok(None);
    };

    let rest = rest.trim().trim_end_matches('{').trim();

    let (name, rest) = extract_quoted(rest)
        .ok_or_else(|| ArchError::GrammarUnknown(format!("{label} missing quoted name: {line}")))?;

    let mut props = vec![("name".to_string(), name)];
    let mut remainder = rest.trim();

    if let Some(after_as) = remainder.strip_prefix("as ") {
        let (variable, after_var) = split_first_token(after_as.trim());
        props.push(("variable".to_string(), variable.to_string()));
        remainder = after_var.trim();
    }

    if let Some(stereotype) = extract_stereotype(remainder) {
        props.push(("stereotype".to_string(), stereotype));
    }

    Ok(Some(ParseNode {
        label: label.to_string(),
        props,
        children: Vec::new(),
    }))
}

/// Parses `<left> <arrow> <right>`, where `<arrow>` is one of the "uses"
/// family (`-->`, `->`) or a dependency-style arrow (`..>`, `..`).
fn parse_relationship_line(line: &str) -> Result<Option<ParseNode>, ArchError> {
    const ARROWS: &[&str] = &["-->", "->", "..>", ".."];

    for arrow in ARROWS {
        if let Some(idx) = line.find(arrow) {
            let left = line[..idx].trim();
            let right = line[idx + arrow.len()..].trim();
            if left.is_empty() || right.is_empty() || left.contains(' ') || right.contains(' ') {
                continue;
            }
            return Ok(Some(ParseNode {
                label: "relationship".to_string(),
                props: vec![
                    ("left".to_string(), left.to_string()),
                    ("right".to_string(), right.to_string()),
                    ("arrow".to_string(), arrow.to_string()),
                ],
                children: Vec::new(),
            }));
        }
    }

    Ok(None)
}

fn extract_quoted(s: &str) -> Option<(String, &str)> {
    let s = s.trim();
    let s = s.strip_prefix('"')?;
    let end = s.find('"')?;
    Some((s[..end].to_string(), &s[end + 1..]))
}

fn extract_stereotype(s: &str) -> Option<String> {
    let s = s.trim();
    let inner = s.strip_prefix("<<")?.strip_suffix(">>")?;
    Some(inner.to_string())
}

fn split_first_token(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], &s[idx..]),
        None => (s, ""),
    }
}

/// "Uses" arrows make the left operand the source; dependency arrows reverse
/// it (matches `puml.py`'s `rel_type == "DEP_USES"` branch).
fn normalize_relationship(left: &str, right: &str, arrow: &str) -> DiagramRelationship {
    match arrow {
        "-->" | "->" => DiagramRelationship {
            src: left.to_string(),
            dst: right.to_string(),
        },
        _ => DiagramRelationship {
            src: right.to_string(),
            dst: left.to_string(),
        },
    }
}

/// Walks the generic parse tree into the typed model via label-keyed
/// dispatch (`NodeLabel`-tagged `match`, per Design Note 9 — never a
/// label→closure hash map). An unrecognized label is fatal.
pub fn build_model(
    tree: &ParseNode,
    next_id: &mut u32,
) -> Result<(DiagramNode, Vec<DiagramRelationship>), ArchError> {
    let mut relationships = Vec::new();
    let children = build_children(&tree.children, next_id, &mut relationships)?;

    let root = DiagramNode {
        id: next_node_id(next_id),
        kind: NodeKind::Root,
        name: None,
        variable: None,
        stereotype: None,
        children,
        fs_ids: Vec::new(),
    };

    Ok((root, relationships))
}

fn next_node_id(next_id: &mut u32) -> u32 {
    let id = *next_id;
    *next_id += 1;
    id
}

enum NodeLabel {
    Package,
    Component,
    Relationship,
    Unknown,
}

fn classify(label: &str) -> NodeLabel {
    match label {
        "package" => NodeLabel::Package,
        "component" => NodeLabel::Component,
        "relationship" => NodeLabel::Relationship,
        _ => NodeLabel::Unknown,
    }
}

fn build_children(
    nodes: &[ParseNode],
    next_id: &mut u32,
    relationships: &mut Vec<DiagramRelationship>,
) -> Result<Vec<DiagramNode>, ArchError> {
    let mut out = Vec::new();

    for node in nodes {
        match classify(&node.label) {
            NodeLabel::Package | NodeLabel::Component => {
                let kind = if matches!(classify(&node.label), NodeLabel::Package) {
                    NodeKind::Package
                } else {
                    NodeKind::Component
                };
                let children = build_children(&node.children, next_id, relationships)?;
                out.push(DiagramNode {
                    id: next_node_id(next_id),
                    kind,
                    name: node.prop("name").map(str::to_string),
                    variable: node.prop("variable").map(str::to_string),
                    stereotype: node.prop("stereotype").map(str::to_string),
                    children,
                    fs_ids: Vec::new(),
                });
            }
            NodeLabel::Relationship => {
                let left = node.prop("left").unwrap_or_default();
                let right = node.prop("right").unwrap_or_default();
                let arrow = node.prop("arrow").unwrap_or_default();
                relationships.push(normalize_relationship(left, right, arrow));
            }
            NodeLabel::Unknown => {
                return Err(ArchError::GrammarUnknown(node.label.clone()));
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_package_with_component_and_relationship() {
        let text = r#"
            @startuml
            ' a comment
            package "Name" as var1 {
              component "Inner" as var2 <<stereotype>>
            }
            component "Other" as var3
            var1 --> var3
            var3 ..> var2
            @enduml
        "#;

        let (root, rels) = parse(text).unwrap();
        assert_eq!(root.kind, NodeKind::Root);
        assert_eq!(root.children.len(), 2);

        let pkg = &root.children[0];
        assert_eq!(pkg.kind, NodeKind::Package);
        assert_eq!(pkg.variable.as_deref(), Some("var1"));
        assert_eq!(pkg.children.len(), 1);
        assert_eq!(pkg.children[0].stereotype.as_deref(), Some("stereotype"));

        assert_eq!(rels.len(), 2);
        assert_eq!(rels[0], DiagramRelationship { src: "var1".into(), dst: "var3".into() });
        // dependency arrow reverses: var3 ..> var2 means var2 is the source.
        assert_eq!(rels[1], DiagramRelationship { src: "var2".into(), dst: "var3".into() });
    }

    #[test]
    fn unrecognized_label_is_fatal() {
        let text = "nonsense line here\n";
        let result = parse(text);
        assert!(matches!(result, Err(ArchError::GrammarUnknown(_))));
    }

    #[test]
    fn node_without_variable_still_parses_with_children_preserved() {
        let text = r#"
            package "Unbound" {
              component "Child" as c1
            }
        "#;
        let (root, _) = parse(text).unwrap();
        let pkg = &root.children[0];
        assert!(pkg.variable.is_none());
        assert_eq!(pkg.children[0].variable.as_deref(), Some("c1"));
    }
}
