use alloc::string::String;
use alloc::vec::Vec;

use crate::info::TypeInfo;

/// One frame of nesting state.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub name: Option<String>,
    /// `-1` for struct nodes and arrays.
    pub id: i32,
    pub ty: Option<&'static TypeInfo>,
    pub is_array: bool,
}

impl NodeInfo {
    pub const EMPTY: Self = Self {
        name: None,
        id: -1,
        ty: None,
        is_array: false,
    };

    pub fn node(name: Option<&str>, id: i32, ty: Option<&'static TypeInfo>) -> Self {
        Self {
            name: name.map(String::from),
            id,
            ty,
            is_array: false,
        }
    }

    pub fn array() -> Self {
        Self {
            is_array: true,
            ..Self::EMPTY
        }
    }
}

/// The depth-bounded frame stack of one reader or writer.
///
/// Cleared when a session is reset, never shared between sessions.
#[derive(Debug, Clone)]
pub struct NodeStack {
    frames: Vec<NodeInfo>,
    max_depth: usize,
}

/// Pushing would exceed the depth cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthExceeded(pub usize);

impl NodeStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::with_capacity(max_depth.min(32)),
            max_depth,
        }
    }

    pub fn push(&mut self, node: NodeInfo) -> Result<(), DepthExceeded> {
        if self.frames.len() >= self.max_depth {
            return Err(DepthExceeded(self.max_depth));
        }
        self.frames.push(node);
        Ok(())
    }

    #[inline]
    pub fn pop(&mut self) -> Option<NodeInfo> {
        self.frames.pop()
    }

    #[inline]
    pub fn current(&self) -> Option<&NodeInfo> {
        self.frames.last()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Whether the innermost frame is an array.
    #[inline]
    pub fn is_in_array(&self) -> bool {
        self.frames.last().is_some_and(|n| n.is_array)
    }

    #[inline]
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    #[inline]
    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_cap() {
        let mut stack = NodeStack::new(2);
        stack.push(NodeInfo::node(Some("a"), 0, None)).unwrap();
        stack.push(NodeInfo::array()).unwrap();
        assert!(stack.is_in_array());
        assert_eq!(stack.push(NodeInfo::EMPTY), Err(DepthExceeded(2)));

        assert!(stack.pop().unwrap().is_array);
        assert_eq!(stack.current().unwrap().id, 0);
        stack.clear();
        assert_eq!(stack.depth(), 0);
    }
}
