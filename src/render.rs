//! Presentation of a graph together with a solution.

use crate::graph::{EdgeId, Graph};
use std::collections::BTreeSet;
use std::io;

/// Draws `graph` with the edges of the exact and the approximate part of a solution
/// highlighted. All edge ids refer to input edges.
pub trait Render {
    fn render(
        &self,
        out: &mut dyn io::Write,
        graph: &Graph,
        exact: &[EdgeId],
        approximate: &[EdgeId],
    ) -> io::Result<()>;
}

/// Graphviz DOT output of the input edges, vertices 1-based like the input file.
///
/// Terminals are boxes, exact edges green, approximate edges red, everything else grey.
#[derive(Clone, Debug)]
pub struct DotRenderer {
    /// Also draw input vertices and edges that are no longer part of `graph`.
    pub show_removed: bool,
}

impl Default for DotRenderer {
    fn default() -> Self {
        Self { show_removed: true }
    }
}

impl Render for DotRenderer {
    fn render(
        &self,
        out: &mut dyn io::Write,
        graph: &Graph,
        exact: &[EdgeId],
        approximate: &[EdgeId],
    ) -> io::Result<()> {
        let exact = exact.iter().copied().collect::<BTreeSet<_>>();
        let approximate = approximate.iter().copied().collect::<BTreeSet<_>>();
        let mut vertices = graph.vertex_ids().collect::<BTreeSet<_>>();
        let mut edges = vec![];
        for id in 0..graph.num_source_edges() {
            let (a, b) = graph.source_edge(id).endpoints;
            let present = graph.contains_vertex(a) && graph.contains_vertex(b);
            let highlighted = exact.contains(&id) || approximate.contains(&id);
            if self.show_removed || present || highlighted {
                vertices.extend([a, b]);
                edges.push(id);
            }
        }

        writeln!(out, "graph steiner {{")?;
        for v in vertices {
            let shape = if graph.is_terminal(v) { "box" } else { "ellipse" };
            writeln!(out, "\t{} [shape={}];", v + 1, shape)?;
        }
        for id in edges {
            let edge = graph.source_edge(id);
            let (a, b) = edge.endpoints;
            let (color, width) = if exact.contains(&id) {
                ("green", 3)
            } else if approximate.contains(&id) {
                ("red", 3)
            } else {
                ("grey", 1)
            };
            writeln!(
                out,
                "\t{} -- {} [label={}, color={}, penwidth={}];",
                a + 1,
                b + 1,
                edge.weight,
                color,
                width
            )?;
        }
        writeln!(out, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::spoke_wheel;
    use crate::util::TestResult;

    #[test]
    fn test_dot_output() -> TestResult {
        let graph = spoke_wheel();
        let mut out = vec![];
        DotRenderer::default().render(&mut out, &graph, &[0, 1], &[2])?;
        let dot = String::from_utf8(out)?;
        assert!(dot.starts_with("graph steiner {\n"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("\t1 [shape=box];\n"));
        assert!(dot.contains("\t5 [shape=ellipse];\n"));
        assert!(dot.contains("\t1 -- 5 [label=1, color=green, penwidth=3];\n"));
        assert!(dot.contains("\t3 -- 5 [label=1, color=red, penwidth=3];\n"));
        assert!(dot.contains("\t1 -- 2 [label=3, color=grey, penwidth=1];\n"));
        assert_eq!(dot.matches(" -- ").count(), 8);
        Ok(())
    }

    #[test]
    fn test_hide_removed() -> TestResult {
        let mut graph = spoke_wheel();
        graph.remove_vertex(4);
        let renderer = DotRenderer {
            show_removed: false,
        };
        let mut out = vec![];
        renderer.render(&mut out, &graph, &[], &[3])?;
        let dot = String::from_utf8(out)?;
        // the rim plus the highlighted spoke
        assert_eq!(dot.matches(" -- ").count(), 5);
        assert!(dot.contains("\t5 [shape=ellipse];\n"));
        Ok(())
    }
}
