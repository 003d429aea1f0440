//! Pipeline graph submitted by the visual editor
//!
//! Nodes are pipeline steps, edges are dependencies between them. Layout
//! fields (positions, zoom, handles, marker styles) carry no execution
//! meaning but are kept so the editor view can be restored from a stored
//! record.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::naming;
use crate::common::handlebars::python_safe;
use crate::errors::{WorkflowError, WorkflowResult};

/// Python variable holding the task created for a node
pub fn step_variable(node_id: &str) -> String {
    format!("step_{}", python_safe(node_id))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NodeToolbar {
    pub position: String,
}

/// Container settings of a step, used verbatim by the templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeAttributes {
    pub input_params: String,
    pub output_params: String,
    pub args: String,
    pub command: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NodeData {
    pub toolbar: NodeToolbar,
    pub attribute: NodeAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub label: String,
    pub position: NodePosition,
    pub data: NodeData,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub events: Map<String, Value>,
}

impl GraphNode {
    pub fn attributes(&self) -> &NodeAttributes {
        &self.data.attribute
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EdgeData {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: String,
    pub target_handle: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub data: EdgeData,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub events: Map<String, Value>,
    #[serde(default)]
    pub marker_end: String,
    #[serde(default)]
    pub source_x: f64,
    #[serde(default)]
    pub source_y: f64,
    #[serde(default)]
    pub target_x: f64,
    #[serde(default)]
    pub target_y: f64,
}

/// Typed pipeline parameter rendered as a pipeline function argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PipelineParameter {
    pub name: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub value: Value,
    pub base_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PipelineGraph {
    #[serde(default)]
    pub pipeline_name: Option<String>,
    #[serde(default)]
    pub pipeline_description: Option<String>,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub parameters: Vec<PipelineParameter>,
    pub position: Vec<f64>,
    /// Stored as-is in the registry's `zoom` column
    pub zoom: i32,
}

impl PipelineGraph {
    /// Reject graphs whose edges cannot be resolved into a dependency order.
    ///
    /// Node ids must be unique once turned into step variables, and those
    /// variables must be plain identifiers. Edges must reference existing
    /// nodes and may not loop back onto their source, and the dependencies
    /// must be acyclic.
    pub fn validate_structure(&self) -> WorkflowResult<()> {
        let mut seen = HashSet::new();
        let mut variables: HashMap<String, &str> = HashMap::new();
        for node in &self.nodes {
            if node.id.trim().is_empty() {
                return Err(WorkflowError::InvalidGraph(
                    "Node id cannot be empty".to_string(),
                ));
            }
            if !seen.insert(node.id.as_str()) {
                return Err(WorkflowError::InvalidGraph(format!(
                    "Duplicate node id '{}'",
                    node.id
                )));
            }

            let variable = step_variable(&node.id);
            if !naming::is_identifier_safe(&variable) {
                return Err(WorkflowError::InvalidGraph(format!(
                    "Node id '{}' contains characters that cannot appear in a step name",
                    node.id
                )));
            }
            if let Some(other) = variables.insert(variable.clone(), node.id.as_str()) {
                return Err(WorkflowError::InvalidGraph(format!(
                    "Node ids '{}' and '{}' both map to step '{}'",
                    other, node.id, variable
                )));
            }
        }

        for edge in &self.edges {
            if edge.source == edge.target {
                return Err(WorkflowError::InvalidGraph(format!(
                    "Edge '{}' connects node '{}' to itself",
                    edge.id, edge.source
                )));
            }
            for endpoint in [&edge.source, &edge.target] {
                if !seen.contains(endpoint.as_str()) {
                    return Err(WorkflowError::InvalidGraph(format!(
                        "Edge '{}' references unknown node '{}'",
                        edge.id, endpoint
                    )));
                }
            }
        }

        self.execution_order().map(|_| ())
    }

    /// Ids of the nodes `node_id` depends on, in edge submission order
    pub fn upstream_of(&self, node_id: &str) -> Vec<&str> {
        let mut upstream: Vec<&str> = Vec::new();
        for edge in self.edges.iter().filter(|e| e.target == node_id) {
            if !upstream.contains(&edge.source.as_str()) {
                upstream.push(edge.source.as_str());
            }
        }
        upstream
    }

    /// Nodes in dependency order (Kahn's algorithm).
    ///
    /// Ties are broken by submission order so the same graph always yields
    /// the same order.
    pub fn execution_order(&self) -> WorkflowResult<Vec<&GraphNode>> {
        let index: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.as_str(), i))
            .collect();

        let mut in_degree = vec![0usize; self.nodes.len()];
        let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        let mut seen_edges = HashSet::new();
        for edge in &self.edges {
            let (Some(&from), Some(&to)) = (
                index.get(edge.source.as_str()),
                index.get(edge.target.as_str()),
            ) else {
                continue;
            };
            if seen_edges.insert((from, to)) {
                downstream[from].push(to);
                in_degree[to] += 1;
            }
        }

        let mut ready: VecDeque<usize> = (0..self.nodes.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut ordered = Vec::with_capacity(self.nodes.len());

        while let Some(current) = ready.pop_front() {
            ordered.push(&self.nodes[current]);
            let mut released = Vec::new();
            for &next in &downstream[current] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    released.push(next);
                }
            }
            released.sort_unstable();
            ready.extend(released);
        }

        if ordered.len() != self.nodes.len() {
            let stuck: Vec<&str> = self
                .nodes
                .iter()
                .enumerate()
                .filter(|(i, _)| in_degree[*i] > 0)
                .map(|(_, node)| node.id.as_str())
                .collect();
            return Err(WorkflowError::InvalidGraph(format!(
                "Dependency cycle between nodes: {}",
                stuck.join(", ")
            )));
        }

        Ok(ordered)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn node(id: &str) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            node_type: "custom".to_string(),
            label: format!("{} step", id),
            position: NodePosition { x: 0.0, y: 0.0 },
            data: NodeData {
                toolbar: NodeToolbar {
                    position: "top".to_string(),
                },
                attribute: NodeAttributes {
                    input_params: String::new(),
                    output_params: String::new(),
                    args: "[]".to_string(),
                    command: "[\"python\", \"main.py\"]".to_string(),
                    image: "python:3.10".to_string(),
                },
            },
            events: Map::new(),
        }
    }

    pub(crate) fn edge(source: &str, target: &str) -> GraphEdge {
        GraphEdge {
            id: format!("e-{}-{}", source, target),
            source: source.to_string(),
            target: target.to_string(),
            source_handle: "bottom".to_string(),
            target_handle: "top".to_string(),
            edge_type: "default".to_string(),
            data: EdgeData {
                text: String::new(),
            },
            events: Map::new(),
            marker_end: String::new(),
            source_x: 0.0,
            source_y: 0.0,
            target_x: 0.0,
            target_y: 0.0,
        }
    }

    pub(crate) fn graph(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> PipelineGraph {
        PipelineGraph {
            pipeline_name: None,
            pipeline_description: None,
            nodes,
            edges,
            parameters: Vec::new(),
            position: vec![0.0, 0.0],
            zoom: 1,
        }
    }

    #[test]
    fn test_deserialize_editor_payload() {
        let payload = json!({
            "pipeline_name": "iris",
            "nodes": [{
                "type": "custom",
                "id": "n1",
                "label": "Load",
                "position": {"x": 10.5, "y": 20.0},
                "data": {
                    "toolbar": {"position": "top"},
                    "attribute": {
                        "inputParams": "", "outputParams": "dataset",
                        "args": "[]", "command": "[\"python\", \"load.py\"]",
                        "image": "python:3.10"
                    }
                },
                "events": {}
            }],
            "edges": [],
            "position": [0, 0],
            "zoom": 1
        });

        let graph: PipelineGraph = serde_json::from_value(payload).unwrap();
        assert_eq!(graph.pipeline_name.as_deref(), Some("iris"));
        assert_eq!(graph.nodes[0].attributes().output_params, "dataset");
        assert!(graph.parameters.is_empty());

        let back = serde_json::to_value(&graph.nodes[0]).unwrap();
        assert_eq!(back["data"]["attribute"]["outputParams"], "dataset");
        assert_eq!(back["type"], "custom");
    }

    #[test]
    fn test_execution_order_follows_edges() {
        let g = graph(
            vec![node("train"), node("load"), node("deploy")],
            vec![edge("load", "train"), edge("train", "deploy")],
        );
        let order: Vec<&str> = g
            .execution_order()
            .unwrap()
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(order, vec!["load", "train", "deploy"]);
    }

    #[test]
    fn test_independent_nodes_keep_submission_order() {
        let g = graph(vec![node("b"), node("a"), node("c")], vec![]);
        let order: Vec<&str> = g
            .execution_order()
            .unwrap()
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_upstream_of() {
        let g = graph(
            vec![node("a"), node("b"), node("c")],
            vec![edge("a", "c"), edge("b", "c"), edge("a", "c")],
        );
        assert_eq!(g.upstream_of("c"), vec!["a", "b"]);
        assert!(g.upstream_of("a").is_empty());
    }

    #[test]
    fn test_rejects_self_loop() {
        let g = graph(vec![node("a")], vec![edge("a", "a")]);
        let err = g.validate_structure().unwrap_err();
        assert!(err.to_string().contains("to itself"));
    }

    #[test]
    fn test_rejects_dangling_edge() {
        let g = graph(vec![node("a")], vec![edge("a", "ghost")]);
        let err = g.validate_structure().unwrap_err();
        assert!(err.to_string().contains("unknown node 'ghost'"));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let g = graph(vec![node("a"), node("a")], vec![]);
        assert!(matches!(
            g.validate_structure(),
            Err(WorkflowError::InvalidGraph(_))
        ));
    }

    #[test]
    fn test_rejects_cycle() {
        let g = graph(
            vec![node("a"), node("b"), node("c")],
            vec![edge("a", "b"), edge("b", "c"), edge("c", "b")],
        );
        let err = g.validate_structure().unwrap_err();
        assert!(err.to_string().contains("cycle"));
        assert!(err.to_string().contains("b, c"));
    }

    #[test]
    fn test_step_variable_sanitizes_punctuation() {
        assert_eq!(step_variable("load-data"), "step_load_data");
        assert_eq!(step_variable("n1"), "step_n1");
    }

    #[test]
    fn test_rejects_ids_colliding_as_step_variables() {
        let g = graph(
            vec![node("load-data"), node("load.data")],
            vec![edge("load-data", "load.data")],
        );
        let err = g.validate_structure().unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidGraph(_)));
        assert!(err.to_string().contains("step_load_data"));
    }

    #[test]
    fn test_rejects_ids_without_identifier_form() {
        for id in ["étape★1", "节点"] {
            let g = graph(vec![node(id)], vec![]);
            let err = g.validate_structure().unwrap_err();
            assert!(err.to_string().contains(id));
        }

        let g = graph(vec![node("load-data"), node("train.v2")], vec![edge("load-data", "train.v2")]);
        assert!(g.validate_structure().is_ok());
    }

    #[test]
    fn test_zoom_outside_column_range_rejected() {
        let payload = json!({
            "pipeline_name": "iris",
            "nodes": [],
            "edges": [],
            "position": [0, 0],
            "zoom": 1_099_511_627_776_i64
        });
        assert!(serde_json::from_value::<PipelineGraph>(payload).is_err());
    }
}
