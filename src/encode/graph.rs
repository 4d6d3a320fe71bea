//! Correlation graph styling.

use std::collections::HashSet;

use serde::Serialize;

use crate::model::{CorrelationGraph, NodeType};

use super::COLOR_ACCENT;

const DEFAULT_NODE_SIZE: f64 = 40.0;
const DEFAULT_EDGE_WIDTH: f64 = 2.0;

/// Render-ready force graph.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphModel {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Edges that referenced a missing node id and were dropped. Dropping is
    /// a documented approximation: a dangling edge cannot be drawn, but it
    /// must never crash the transformer.
    pub dropped_edges: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub node_type: NodeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    pub symbol_size: f64,
    pub symbol: &'static str,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub relationship: String,
    pub line_width: f64,
}

/// Fixed per-type palette; anything unrecognized gets the accent circle.
fn node_style(node_type: NodeType) -> (&'static str, &'static str) {
    match node_type {
        NodeType::Ip => (COLOR_ACCENT, "circle"),
        NodeType::Device => ("#52c41a", "rect"),
        NodeType::User => ("#faad14", "diamond"),
        NodeType::Process => ("#722ed1", "triangle"),
        NodeType::File => ("#eb2f96", "roundRect"),
        NodeType::Unknown => (COLOR_ACCENT, "circle"),
    }
}

/// Style an alert's correlation graph. Nodes with missing risk scores and
/// edges with missing weights get fixed defaults rather than being dropped.
pub fn encode_graph(graph: &CorrelationGraph) -> GraphModel {
    let nodes: Vec<GraphNode> = graph
        .nodes
        .iter()
        .map(|node| {
            let (color, symbol) = node_style(node.node_type);
            GraphNode {
                id: node.id.clone(),
                name: node.label.clone(),
                node_type: node.node_type,
                risk_score: node.risk_score,
                symbol_size: node
                    .risk_score
                    .map(|risk| risk * 50.0 + 20.0)
                    .unwrap_or(DEFAULT_NODE_SIZE),
                symbol,
                color,
            }
        })
        .collect();

    let known_ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut dropped_edges = 0usize;
    let edges: Vec<GraphEdge> = graph
        .edges
        .iter()
        .filter(|edge| {
            let intact =
                known_ids.contains(edge.source.as_str()) && known_ids.contains(edge.target.as_str());
            if !intact {
                dropped_edges += 1;
            }
            intact
        })
        .map(|edge| GraphEdge {
            source: edge.source.clone(),
            target: edge.target.clone(),
            relationship: edge.relationship.clone(),
            line_width: edge.weight.map(|w| w * 3.0).unwrap_or(DEFAULT_EDGE_WIDTH),
        })
        .collect();

    GraphModel {
        nodes,
        edges,
        dropped_edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CorrelationEdge, CorrelationNode};

    fn node(id: &str, node_type: NodeType, risk_score: Option<f64>) -> CorrelationNode {
        CorrelationNode {
            id: id.into(),
            node_type,
            label: id.to_uppercase(),
            risk_score,
        }
    }

    fn edge(source: &str, target: &str, weight: Option<f64>) -> CorrelationEdge {
        CorrelationEdge {
            source: source.into(),
            target: target.into(),
            relationship: "connected_to".into(),
            weight,
        }
    }

    #[test]
    fn risk_score_drives_symbol_size() {
        let graph = CorrelationGraph {
            nodes: vec![
                node("a", NodeType::Ip, Some(0.5)),
                node("b", NodeType::Device, None),
            ],
            edges: vec![],
        };
        let model = encode_graph(&graph);
        assert_eq!(model.nodes[0].symbol_size, 45.0);
        assert_eq!(model.nodes[1].symbol_size, 40.0);
    }

    #[test]
    fn weight_drives_line_width() {
        let graph = CorrelationGraph {
            nodes: vec![node("a", NodeType::Ip, None), node("b", NodeType::User, None)],
            edges: vec![edge("a", "b", Some(2.0)), edge("b", "a", None)],
        };
        let model = encode_graph(&graph);
        assert_eq!(model.edges[0].line_width, 6.0);
        assert_eq!(model.edges[1].line_width, 2.0);
    }

    #[test]
    fn unknown_node_type_is_styled_not_dropped() {
        let graph = CorrelationGraph {
            nodes: vec![node("x", NodeType::Unknown, None)],
            edges: vec![],
        };
        let model = encode_graph(&graph);
        assert_eq!(model.nodes.len(), 1);
        assert_eq!(model.nodes[0].color, COLOR_ACCENT);
        assert_eq!(model.nodes[0].symbol, "circle");
    }

    #[test]
    fn dangling_edges_are_dropped_and_counted() {
        let graph = CorrelationGraph {
            nodes: vec![node("a", NodeType::Ip, None)],
            edges: vec![edge("a", "ghost", Some(1.0)), edge("missing", "a", None)],
        };
        let model = encode_graph(&graph);
        assert!(model.edges.is_empty());
        assert_eq!(model.dropped_edges, 2);
        assert_eq!(model.nodes.len(), 1);
    }

    #[test]
    fn per_type_palette_is_stable() {
        for (node_type, color, symbol) in [
            (NodeType::Ip, "#1890ff", "circle"),
            (NodeType::Device, "#52c41a", "rect"),
            (NodeType::User, "#faad14", "diamond"),
            (NodeType::Process, "#722ed1", "triangle"),
            (NodeType::File, "#eb2f96", "roundRect"),
        ] {
            let graph = CorrelationGraph {
                nodes: vec![node("n", node_type, None)],
                edges: vec![],
            };
            let model = encode_graph(&graph);
            assert_eq!(model.nodes[0].color, color);
            assert_eq!(model.nodes[0].symbol, symbol);
        }
    }
}
