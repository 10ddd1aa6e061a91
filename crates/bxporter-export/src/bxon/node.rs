//! In-memory `.bxon` tree
//!
//! Nodes are built bottom-up and attached with [`MapNode::put`] or
//! [`ArrayNode::push_node`]. Typed arrays check every push against their
//! stride and declared count; an array that was declared larger than what
//! was pushed is only detected when the tree is flushed.

use bxporter_core::{Error, Result};
use serde_json::{Map, Value};

/// Type tags shared by natives and typed arrays
pub mod tags {
    pub const NODES: u8 = 0x00;
    pub const BOOL: u8 = 0x01;
    pub const INT: u8 = 0x02;
    pub const FLOAT: u8 = 0x03;
    pub const STRING: u8 = 0x04;
    pub const MAP: u8 = 0x10;
    pub const ARRAY: u8 = 0x20;
    /// Low bits of an array tag holding the element tag
    pub const ELEMENT_MASK: u8 = 0x0F;
}

/// A scalar leaf
#[derive(Debug, Clone, PartialEq)]
pub enum Native {
    Bool(bool),
    Int(i32),
    Float(f32),
    String(String),
}

impl Native {
    pub fn tag(&self) -> u8 {
        match self {
            Native::Bool(_) => tags::BOOL,
            Native::Int(_) => tags::INT,
            Native::Float(_) => tags::FLOAT,
            Native::String(_) => tags::STRING,
        }
    }
}

/// Any tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Native(Native),
    Map(MapNode),
    Array(ArrayNode),
}

impl Node {
    /// Leading type tag when encoded
    pub fn tag(&self) -> u8 {
        match self {
            Node::Native(native) => native.tag(),
            Node::Map(_) => tags::MAP,
            Node::Array(array) => tags::ARRAY | array.element_tag(),
        }
    }

    pub fn as_map(&self) -> Option<&MapNode> {
        match self {
            Node::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayNode> {
        match self {
            Node::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Native(Native::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Node::Native(Native::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Node::Native(Native::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Native(Native::String(v)) => Some(v),
            _ => None,
        }
    }

    /// Child of a map node
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Follow a path of map keys
    pub fn path(&self, keys: &[&str]) -> Option<&Node> {
        keys.iter().try_fold(self, |node, key| node.get(key))
    }

    /// JSON view for inspection; typed arrays become rows of `stride` values
    pub fn to_json(&self) -> Value {
        match self {
            Node::Native(Native::Bool(v)) => Value::from(*v),
            Node::Native(Native::Int(v)) => Value::from(*v),
            Node::Native(Native::Float(v)) => Value::from(*v),
            Node::Native(Native::String(v)) => Value::from(v.as_str()),
            Node::Map(map) => {
                let mut object = Map::new();
                for (key, node) in map.iter() {
                    object.insert(key.to_string(), node.to_json());
                }
                Value::Object(object)
            }
            Node::Array(array) => array.to_json(),
        }
    }
}

impl From<bool> for Node {
    fn from(v: bool) -> Self {
        Node::Native(Native::Bool(v))
    }
}

impl From<i32> for Node {
    fn from(v: i32) -> Self {
        Node::Native(Native::Int(v))
    }
}

impl From<f32> for Node {
    fn from(v: f32) -> Self {
        Node::Native(Native::Float(v))
    }
}

impl From<&str> for Node {
    fn from(v: &str) -> Self {
        Node::Native(Native::String(v.to_string()))
    }
}

impl From<String> for Node {
    fn from(v: String) -> Self {
        Node::Native(Native::String(v))
    }
}

impl From<MapNode> for Node {
    fn from(v: MapNode) -> Self {
        Node::Map(v)
    }
}

impl From<ArrayNode> for Node {
    fn from(v: ArrayNode) -> Self {
        Node::Array(v)
    }
}

/// Ordered string-keyed children
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapNode {
    entries: Vec<(String, Node)>,
}

impl MapNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a child; keys are unique within a map
    pub fn put(&mut self, key: impl Into<String>, node: impl Into<Node>) -> Result<()> {
        let key = key.into();
        if self.contains(&key) {
            return Err(Error::consistency(format!("duplicate map key \"{}\"", key)));
        }
        self.entries.push((key, node.into()));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, node)| node)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> + '_ {
        self.entries.iter().map(|(k, node)| (k.as_str(), node))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

/// Array element storage
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Nodes(Vec<Node>),
    Bool(Vec<bool>),
    Int(Vec<i32>),
    Float(Vec<f32>),
}

impl ArrayData {
    /// Stored scalars or nodes
    fn len(&self) -> usize {
        match self {
            ArrayData::Nodes(v) => v.len(),
            ArrayData::Bool(v) => v.len(),
            ArrayData::Int(v) => v.len(),
            ArrayData::Float(v) => v.len(),
        }
    }

    fn tag(&self) -> u8 {
        match self {
            ArrayData::Nodes(_) => tags::NODES,
            ArrayData::Bool(_) => tags::BOOL,
            ArrayData::Int(_) => tags::INT,
            ArrayData::Float(_) => tags::FLOAT,
        }
    }
}

/// Homogeneous sequence of nodes or packed scalars
///
/// A typed array holds `count` elements of `stride` scalars each. A node
/// array always has stride 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayNode {
    data: ArrayData,
    stride: usize,
    declared: Option<usize>,
}

impl ArrayNode {
    /// Array of nested nodes
    pub fn nodes() -> Self {
        Self::with_data(ArrayData::Nodes(Vec::new()), 1)
    }

    /// Packed f32 array
    pub fn floats(stride: usize) -> Self {
        Self::with_data(ArrayData::Float(Vec::new()), stride)
    }

    /// Packed i32 array
    pub fn ints(stride: usize) -> Self {
        Self::with_data(ArrayData::Int(Vec::new()), stride)
    }

    /// Packed bool array
    pub fn bools(stride: usize) -> Self {
        Self::with_data(ArrayData::Bool(Vec::new()), stride)
    }

    fn with_data(data: ArrayData, stride: usize) -> Self {
        Self {
            data,
            stride: stride.max(1),
            declared: None,
        }
    }

    /// Declare the final element count up front
    pub fn with_count(mut self, count: usize) -> Self {
        self.declared = Some(count);
        self
    }

    /// Rebuild an array from decoded parts
    pub(crate) fn from_parts(data: ArrayData, stride: usize, count: usize) -> Self {
        Self {
            data,
            stride: stride.max(1),
            declared: Some(count),
        }
    }

    /// Element tag, `tags::NODES` for nested nodes
    pub fn element_tag(&self) -> u8 {
        self.data.tag()
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Elements pushed so far
    pub fn count(&self) -> usize {
        self.data.len() / self.stride
    }

    pub fn declared_count(&self) -> Option<usize> {
        self.declared
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn as_floats(&self) -> Option<&[f32]> {
        match &self.data {
            ArrayData::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i32]> {
        match &self.data {
            ArrayData::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bools(&self) -> Option<&[bool]> {
        match &self.data {
            ArrayData::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_nodes(&self) -> Option<&[Node]> {
        match &self.data {
            ArrayData::Nodes(v) => Some(v),
            _ => None,
        }
    }

    /// Element `index` of a typed array as a `stride`-long slice of floats
    pub fn float_element(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.stride)?;
        self.as_floats()?.get(start..start + self.stride)
    }

    fn check_push(&self, arity: usize) -> Result<()> {
        if arity != self.stride {
            return Err(Error::consistency(format!(
                "array of stride {} cannot take {} values",
                self.stride, arity
            )));
        }
        if let Some(declared) = self.declared {
            if self.count() >= declared {
                return Err(Error::consistency(format!(
                    "array declared with {} elements is full",
                    declared
                )));
            }
        }
        Ok(())
    }

    fn type_mismatch(&self, pushed: &str) -> Error {
        Error::consistency(format!(
            "cannot push {} into array with element tag {:#04x}",
            pushed,
            self.element_tag()
        ))
    }

    /// Push one element of a float array
    pub fn push_floats(&mut self, values: &[f32]) -> Result<()> {
        self.check_push(values.len())?;
        match &mut self.data {
            ArrayData::Float(v) => {
                v.extend_from_slice(values);
                Ok(())
            }
            _ => Err(self.type_mismatch("floats")),
        }
    }

    /// Push one element of an int array
    pub fn push_ints(&mut self, values: &[i32]) -> Result<()> {
        self.check_push(values.len())?;
        match &mut self.data {
            ArrayData::Int(v) => {
                v.extend_from_slice(values);
                Ok(())
            }
            _ => Err(self.type_mismatch("ints")),
        }
    }

    /// Push one element of a bool array
    pub fn push_bools(&mut self, values: &[bool]) -> Result<()> {
        self.check_push(values.len())?;
        match &mut self.data {
            ArrayData::Bool(v) => {
                v.extend_from_slice(values);
                Ok(())
            }
            _ => Err(self.type_mismatch("bools")),
        }
    }

    /// Push a nested node
    pub fn push_node(&mut self, node: impl Into<Node>) -> Result<()> {
        self.check_push(1)?;
        match &mut self.data {
            ArrayData::Nodes(v) => {
                v.push(node.into());
                Ok(())
            }
            _ => Err(self.type_mismatch("a node")),
        }
    }

    /// Fail if fewer elements were pushed than declared
    pub fn check_complete(&self) -> Result<()> {
        match self.declared {
            Some(declared) if self.count() != declared => Err(Error::consistency(format!(
                "array declared with {} elements holds {}",
                declared,
                self.count()
            ))),
            _ => Ok(()),
        }
    }

    fn to_json(&self) -> Value {
        fn rows<T: Copy + Into<Value>>(values: &[T], stride: usize) -> Value {
            if stride == 1 {
                Value::Array(values.iter().map(|&v| v.into()).collect())
            } else {
                Value::Array(
                    values
                        .chunks(stride)
                        .map(|row| Value::Array(row.iter().map(|&v| v.into()).collect()))
                        .collect(),
                )
            }
        }

        match &self.data {
            ArrayData::Nodes(nodes) => Value::Array(nodes.iter().map(Node::to_json).collect()),
            ArrayData::Bool(v) => rows(v, self.stride),
            ArrayData::Int(v) => rows(v, self.stride),
            ArrayData::Float(v) => rows(v, self.stride),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_enforced() {
        let mut positions = ArrayNode::floats(3);
        positions.push_floats(&[0.0, 1.0, 2.0]).unwrap();

        let err = positions.push_floats(&[0.0, 1.0]).unwrap_err();
        assert!(err.is_consistency_violation());
        assert_eq!(positions.count(), 1);
    }

    #[test]
    fn test_declared_count_overflow() {
        let mut faces = ArrayNode::ints(3).with_count(1);
        faces.push_ints(&[0, 1, 2]).unwrap();
        assert!(faces.check_complete().is_ok());
        assert!(faces.push_ints(&[2, 3, 0]).unwrap_err().is_consistency_violation());
    }

    #[test]
    fn test_declared_count_underflow() {
        let mut faces = ArrayNode::ints(4).with_count(2);
        faces.push_ints(&[0, 1, 2, 3]).unwrap();
        assert!(faces.check_complete().unwrap_err().is_consistency_violation());
    }

    #[test]
    fn test_type_mismatch() {
        let mut names = ArrayNode::nodes();
        names.push_node("Wood").unwrap();
        assert!(names.push_floats(&[1.0]).is_err());

        let mut floats = ArrayNode::floats(1);
        assert!(floats.push_node(1.0f32).is_err());
    }

    #[test]
    fn test_map_keeps_order_and_rejects_duplicates() {
        let mut map = MapNode::new();
        map.put("b", 1).unwrap();
        map.put("a", 2).unwrap();
        assert!(map.put("b", 3).is_err());

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(map.get("a").and_then(Node::as_int), Some(2));
    }

    #[test]
    fn test_tags() {
        assert_eq!(Node::from(true).tag(), tags::BOOL);
        assert_eq!(Node::from("x").tag(), tags::STRING);
        assert_eq!(Node::from(ArrayNode::floats(3)).tag(), 0x23);
        assert_eq!(Node::from(ArrayNode::nodes()).tag(), 0x20);
        assert_eq!(Node::from(MapNode::new()).tag(), 0x10);
    }

    #[test]
    fn test_json_view_groups_rows() {
        let mut uv = ArrayNode::floats(2);
        uv.push_floats(&[0.0, 1.0]).unwrap();
        uv.push_floats(&[1.0, 1.0]).unwrap();

        let json = Node::from(uv).to_json();
        assert_eq!(json, serde_json::json!([[0.0, 1.0], [1.0, 1.0]]));
    }
}
