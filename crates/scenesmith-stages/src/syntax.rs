//! Python syntax check backed by tree-sitter.

/// Parse `code` and report the first error or missing node.
///
/// The message carries a 1-based line and column so it can be fed back to
/// the model verbatim.
pub fn check_python(code: &str) -> Result<(), String> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| format!("Syntax check unavailable: {e}"))?;

    let tree = parser
        .parse(code, None)
        .ok_or_else(|| "Syntax error: parser produced no tree".to_string())?;

    let root = tree.root_node();
    if !root.has_error() {
        return Ok(());
    }

    match first_problem(root) {
        Some(node) => {
            let pos = node.start_position();
            let what = if node.is_missing() {
                format!("missing '{}'", node.kind())
            } else {
                "invalid syntax".to_string()
            };
            Err(format!(
                "Syntax error: {what} at line {}, column {}",
                pos.row + 1,
                pos.column + 1
            ))
        }
        None => Err("Syntax error".to_string()),
    }
}

/// Depth-first search for the first node that is an error or was inserted
/// by the parser's recovery.
fn first_problem(node: tree_sitter::Node<'_>) -> Option<tree_sitter::Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i)
            && let Some(found) = first_problem(child)
        {
            return Some(found);
        }
    }
    None
}
