//! The shape of the agent loop as a graph.
//!
//! The loop is fixed: `__start__` enters `agent`, `agent` either goes to
//! `tools` or ends, and `tools` always returns to `agent`.

/// Name of the model invocation node.
pub const AGENT_NODE: &str = "agent";
/// Name of the tool dispatch node.
pub const TOOLS_NODE: &str = "tools";
/// Name of the entry node.
pub const START_NODE: &str = "__start__";
/// Name of the terminal node.
pub const END_NODE: &str = "__end__";

/// Renders the loop as a Mermaid flowchart. Conditional edges are dotted.
pub fn draw_mermaid() -> String {
    let mut out = String::new();
    out.push_str("%%{init: {'flowchart': {'curve': 'linear'}}}%%\n");
    out.push_str("graph TD;\n");
    out.push_str(&format!("\t{START_NODE}([<p>{START_NODE}</p>]):::first\n"));
    out.push_str(&format!("\t{AGENT_NODE}({AGENT_NODE})\n"));
    out.push_str(&format!("\t{TOOLS_NODE}({TOOLS_NODE})\n"));
    out.push_str(&format!("\t{END_NODE}([<p>{END_NODE}</p>]):::last\n"));
    out.push_str(&format!("\t{START_NODE} --> {AGENT_NODE};\n"));
    out.push_str(&format!("\t{TOOLS_NODE} --> {AGENT_NODE};\n"));
    out.push_str(&format!("\t{AGENT_NODE} -.-> {TOOLS_NODE};\n"));
    out.push_str(&format!("\t{AGENT_NODE} -.-> {END_NODE};\n"));
    out.push_str("\tclassDef default fill:#f2f0ff,line-height:1.2\n");
    out.push_str("\tclassDef first fill-opacity:0\n");
    out.push_str("\tclassDef last fill:#bfb6fc\n");
    out
}
