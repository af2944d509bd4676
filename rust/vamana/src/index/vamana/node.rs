//! Node and query records.

use crate::types::{Category, IdType, VectorElement};

/// A graph node.
///
/// Nodes are created once by [`VamanaGraph::create_node`](super::VamanaGraph::create_node)
/// and never mutated afterwards; the rest of the crate refers to them by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<T: VectorElement> {
    id: IdType,
    category: Option<Category>,
    value: Vec<T>,
}

impl<T: VectorElement> Node<T> {
    pub(crate) fn new(id: IdType, category: Option<Category>, value: Vec<T>) -> Self {
        Self {
            id,
            category,
            value,
        }
    }

    #[inline]
    pub fn id(&self) -> IdType {
        self.id
    }

    /// Category, `None` when the node is uncategorized.
    #[inline]
    pub fn category(&self) -> Option<Category> {
        self.category
    }

    #[inline]
    pub fn value(&self) -> &[T] {
        &self.value
    }
}

/// A search request.
///
/// Unfiltered queries carry no category. Filtered queries restrict the
/// search to nodes of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct Query<T: VectorElement> {
    pub id: IdType,
    pub category: Option<Category>,
    pub filtered: bool,
    pub value: Vec<T>,
}

impl<T: VectorElement> Query<T> {
    /// An unfiltered query.
    pub fn new(id: IdType, value: Vec<T>) -> Self {
        Self {
            id,
            category: None,
            filtered: false,
            value,
        }
    }

    /// A query restricted to `category`.
    pub fn filtered(id: IdType, value: Vec<T>, category: Category) -> Self {
        Self {
            id,
            category: Some(category),
            filtered: true,
            value,
        }
    }

    /// A query is empty when it has no category or no value.
    pub fn is_empty(&self) -> bool {
        self.category.is_none() || self.value.is_empty()
    }

    /// The category the search must stay inside, if any.
    #[inline]
    pub fn filter_category(&self) -> Option<Category> {
        if self.filtered {
            self.category
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_accessors() {
        let node = Node::new(3, Some(7), vec![1.0f32, 2.0]);
        assert_eq!(node.id(), 3);
        assert_eq!(node.category(), Some(7));
        assert_eq!(node.value(), &[1.0, 2.0]);
    }

    #[test]
    fn test_query_emptiness() {
        assert!(Query::new(0, vec![1.0f32]).is_empty());
        assert!(Query::<f32>::filtered(0, vec![], 1).is_empty());
        assert!(!Query::filtered(0, vec![1.0f32], 1).is_empty());
    }

    #[test]
    fn test_query_filter_category() {
        assert_eq!(Query::new(0, vec![1.0f32]).filter_category(), None);
        assert_eq!(Query::filtered(0, vec![1.0f32], 4).filter_category(), Some(4));

        let mut q = Query::filtered(0, vec![1.0f32], 4);
        q.filtered = false;
        assert_eq!(q.filter_category(), None);
    }
}
