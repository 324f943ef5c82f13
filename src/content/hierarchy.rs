/*!
 * Page hierarchy
 *
 * Pages are stored flat with an optional `parent_id` and a manual
 * `sort_order`. Navigation shows one level of nesting: every page with a
 * resolvable parent is displayed at level 1 under its top-level ancestor,
 * directly after that ancestor, in source order.
 */
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use uuid::Uuid;

/// A page as far as ordering and nesting are concerned.
pub trait TreeNode: Clone {
    fn id(&self) -> Uuid;
    fn parent_id(&self) -> Option<Uuid>;
    fn set_parent_id(&mut self, parent_id: Option<Uuid>);
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("no page at position {0}")]
    IndexOutOfRange(usize),

    #[error("page {0} not found")]
    PageNotFound(Uuid),

    #[error("parent page {0} not found")]
    ParentNotFound(Uuid),

    #[error("a page cannot be its own parent")]
    SelfParent,

    #[error("parent page {0} is already nested; pages nest one level deep")]
    ParentIsNested(Uuid),

    #[error("page {0} has child pages and cannot be nested")]
    HasChildren(Uuid),
}

/// A page in display order with its nesting level (0 or 1).
#[derive(Debug, Clone, Serialize)]
pub struct HierarchicalPage<T> {
    #[serde(flatten)]
    pub page: T,
    pub level: u8,
    /// The top-level page this entry is grouped under (itself at level 0).
    #[serde(skip)]
    pub root_id: Uuid,
}

/// Top-level ancestor of `index`, or `None` when the page is itself
/// top-level (no parent, dangling parent, or a parent cycle).
fn root_of<T: TreeNode>(pages: &[T], by_id: &HashMap<Uuid, usize>, index: usize) -> Option<Uuid> {
    let mut visited = HashSet::from([pages[index].id()]);
    let mut current = index;

    while let Some(&parent) = pages[current].parent_id().and_then(|p| by_id.get(&p)) {
        if !visited.insert(pages[parent].id()) {
            return None;
        }
        current = parent;
    }

    (current != index).then(|| pages[current].id())
}

/// Resolve a flat list into display order: each top-level page followed by
/// the pages nested under it.
pub fn flatten<T: TreeNode>(pages: &[T]) -> Vec<HierarchicalPage<T>> {
    let by_id: HashMap<Uuid, usize> = pages
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id(), i))
        .collect();

    let mut top_level: Vec<usize> = Vec::new();
    let mut children: HashMap<Uuid, Vec<usize>> = HashMap::new();

    for index in 0..pages.len() {
        match root_of(pages, &by_id, index) {
            Some(root) => children.entry(root).or_default().push(index),
            None => top_level.push(index),
        }
    }

    let mut flattened = Vec::with_capacity(pages.len());
    for index in top_level {
        let root_id = pages[index].id();
        flattened.push(HierarchicalPage {
            page: pages[index].clone(),
            level: 0,
            root_id,
        });
        for &child in children.get(&root_id).into_iter().flatten() {
            flattened.push(HierarchicalPage {
                page: pages[child].clone(),
                level: 1,
                root_id,
            });
        }
    }
    flattened
}

/// Check that `page_id` may take `parent_id` without breaking the
/// one-level nesting rule.
pub fn validate_parent<T: TreeNode>(
    pages: &[T],
    page_id: Uuid,
    parent_id: Option<Uuid>,
) -> Result<(), HierarchyError> {
    if !pages.iter().any(|p| p.id() == page_id) {
        return Err(HierarchyError::PageNotFound(page_id));
    }

    let Some(parent_id) = parent_id else {
        return Ok(());
    };

    if parent_id == page_id {
        return Err(HierarchyError::SelfParent);
    }

    let parent = pages
        .iter()
        .find(|p| p.id() == parent_id)
        .ok_or(HierarchyError::ParentNotFound(parent_id))?;

    if parent.parent_id().is_some() {
        return Err(HierarchyError::ParentIsNested(parent_id));
    }

    if pages.iter().any(|p| p.parent_id() == Some(page_id)) {
        return Err(HierarchyError::HasChildren(page_id));
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Applied,
    Unchanged,
}

/// The admin's editable page list. Every change is persisted through the
/// supplied callback; a failed reorder restores the last persisted order and
/// a failed nest/unnest leaves the list untouched.
#[derive(Debug, Clone)]
pub struct PageList<T> {
    pages: Vec<T>,
    committed: Vec<T>,
}

impl<T: TreeNode> PageList<T> {
    pub fn new(pages: Vec<T>) -> Self {
        Self {
            committed: pages.clone(),
            pages,
        }
    }

    pub fn pages(&self) -> &[T] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<T> {
        self.pages
    }

    pub fn order(&self) -> Vec<Uuid> {
        self.pages.iter().map(|p| p.id()).collect()
    }

    pub fn display(&self) -> Vec<HierarchicalPage<T>> {
        flatten(&self.pages)
    }

    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.pages.iter().position(|p| p.id() == id)
    }

    pub fn display_position(&self, id: Uuid) -> Option<usize> {
        self.display().iter().position(|p| p.page.id() == id)
    }

    pub async fn move_up<F, Fut, E>(&mut self, index: usize, persist: F) -> Result<Change, E>
    where
        F: FnOnce(Vec<Uuid>) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: From<HierarchyError>,
    {
        if index >= self.pages.len() {
            return Err(HierarchyError::IndexOutOfRange(index).into());
        }
        if index == 0 {
            return Ok(Change::Unchanged);
        }
        self.swap_and_persist(index - 1, index, persist).await
    }

    pub async fn move_down<F, Fut, E>(&mut self, index: usize, persist: F) -> Result<Change, E>
    where
        F: FnOnce(Vec<Uuid>) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: From<HierarchyError>,
    {
        if index >= self.pages.len() {
            return Err(HierarchyError::IndexOutOfRange(index).into());
        }
        if index == self.pages.len() - 1 {
            return Ok(Change::Unchanged);
        }
        self.swap_and_persist(index, index + 1, persist).await
    }

    async fn swap_and_persist<F, Fut, E>(&mut self, a: usize, b: usize, persist: F) -> Result<Change, E>
    where
        F: FnOnce(Vec<Uuid>) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        self.pages.swap(a, b);
        match persist(self.order()).await {
            Ok(()) => {
                self.committed = self.pages.clone();
                Ok(Change::Applied)
            }
            Err(e) => {
                tracing::warn!("page reorder failed to persist, restoring previous order");
                self.pages = self.committed.clone();
                Err(e)
            }
        }
    }

    /// Nest the page shown at `display_index` under the page above it. When
    /// the page above is itself nested, its parent is used so the two become
    /// siblings.
    pub async fn nest<F, Fut, E>(&mut self, display_index: usize, persist: F) -> Result<Change, E>
    where
        F: FnOnce(Uuid, Option<Uuid>) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: From<HierarchyError>,
    {
        let display = self.display();
        if display_index >= display.len() {
            return Err(HierarchyError::IndexOutOfRange(display_index).into());
        }
        if display_index == 0 {
            return Ok(Change::Unchanged);
        }

        let page_id = display[display_index].page.id();
        let target = display[display_index - 1].root_id;
        if display[display_index].page.parent_id() == Some(target) {
            return Ok(Change::Unchanged);
        }

        validate_parent(&self.pages, page_id, Some(target))?;
        persist(page_id, Some(target)).await?;
        self.set_parent(page_id, Some(target));
        Ok(Change::Applied)
    }

    /// Move the page shown at `display_index` back to the top level.
    pub async fn unnest<F, Fut, E>(&mut self, display_index: usize, persist: F) -> Result<Change, E>
    where
        F: FnOnce(Uuid, Option<Uuid>) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: From<HierarchyError>,
    {
        let display = self.display();
        let entry = display
            .get(display_index)
            .ok_or(HierarchyError::IndexOutOfRange(display_index))?;
        if entry.page.parent_id().is_none() {
            return Ok(Change::Unchanged);
        }

        let page_id = entry.page.id();
        persist(page_id, None).await?;
        self.set_parent(page_id, None);
        Ok(Change::Applied)
    }

    fn set_parent(&mut self, page_id: Uuid, parent_id: Option<Uuid>) {
        for list in [&mut self.pages, &mut self.committed] {
            if let Some(page) = list.iter_mut().find(|p| p.id() == page_id) {
                page.set_parent_id(parent_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq)]
    struct Node {
        id: Uuid,
        name: &'static str,
        parent_id: Option<Uuid>,
    }

    impl TreeNode for Node {
        fn id(&self) -> Uuid {
            self.id
        }
        fn parent_id(&self) -> Option<Uuid> {
            self.parent_id
        }
        fn set_parent_id(&mut self, parent_id: Option<Uuid>) {
            self.parent_id = parent_id;
        }
    }

    #[derive(Debug, PartialEq)]
    enum TestError {
        Hierarchy(HierarchyError),
        Persist,
    }

    impl From<HierarchyError> for TestError {
        fn from(e: HierarchyError) -> Self {
            TestError::Hierarchy(e)
        }
    }

    fn node(name: &'static str) -> Node {
        Node {
            id: Uuid::new_v4(),
            name,
            parent_id: None,
        }
    }

    fn child_of(name: &'static str, parent: &Node) -> Node {
        Node {
            parent_id: Some(parent.id),
            ..node(name)
        }
    }

    fn names(pages: &[Node]) -> Vec<&'static str> {
        pages.iter().map(|p| p.name).collect()
    }

    fn display_names(list: &PageList<Node>) -> Vec<(&'static str, u8)> {
        list.display().iter().map(|h| (h.page.name, h.level)).collect()
    }

    #[test]
    fn test_flatten_places_children_after_parent() {
        let a = node("A");
        let b = node("B");
        let c = child_of("C", &b);
        let flat = flatten(&[a, b, c]);
        let order: Vec<_> = flat.iter().map(|h| (h.page.name, h.level)).collect();
        assert_eq!(order, vec![("A", 0), ("B", 0), ("C", 1)]);
    }

    #[test]
    fn test_flatten_groups_child_listed_before_parent() {
        let a = node("A");
        let b = child_of("B", &a);
        let c = node("C");
        let flat = flatten(&[b, c, a]);
        let order: Vec<_> = flat.iter().map(|h| (h.page.name, h.level)).collect();
        assert_eq!(order, vec![("C", 0), ("A", 0), ("B", 1)]);
    }

    #[test]
    fn test_flatten_collapses_grandchildren_to_level_one() {
        let a = node("A");
        let b = child_of("B", &a);
        let c = child_of("C", &b);
        let d = child_of("D", &a);
        let flat = flatten(&[a, b, c, d]);
        let order: Vec<_> = flat.iter().map(|h| (h.page.name, h.level)).collect();
        assert_eq!(order, vec![("A", 0), ("B", 1), ("C", 1), ("D", 1)]);
    }

    #[test]
    fn test_flatten_treats_dangling_parent_and_cycles_as_top_level() {
        let mut orphan = node("Orphan");
        orphan.parent_id = Some(Uuid::new_v4());
        let mut x = node("X");
        let mut y = node("Y");
        x.parent_id = Some(y.id);
        y.parent_id = Some(x.id);
        let flat = flatten(&[orphan, x, y]);
        assert!(flat.iter().all(|h| h.level == 0));
        assert_eq!(flat.len(), 3);
    }

    #[test]
    fn test_validate_parent_enforces_one_level() {
        let a = node("A");
        let b = child_of("B", &a);
        let c = node("C");
        let pages = vec![a.clone(), b.clone(), c.clone()];

        assert_eq!(validate_parent(&pages, c.id, Some(a.id)), Ok(()));
        assert_eq!(validate_parent(&pages, c.id, None), Ok(()));
        assert_eq!(
            validate_parent(&pages, c.id, Some(b.id)),
            Err(HierarchyError::ParentIsNested(b.id))
        );
        assert_eq!(
            validate_parent(&pages, a.id, Some(c.id)),
            Err(HierarchyError::HasChildren(a.id))
        );
        assert_eq!(
            validate_parent(&pages, c.id, Some(c.id)),
            Err(HierarchyError::SelfParent)
        );
        let missing = Uuid::new_v4();
        assert_eq!(
            validate_parent(&pages, c.id, Some(missing)),
            Err(HierarchyError::ParentNotFound(missing))
        );
    }

    #[tokio::test]
    async fn test_move_at_boundaries_does_not_persist() {
        let mut list = PageList::new(vec![node("A"), node("B"), node("C")]);
        let calls = Cell::new(0);

        let up = list
            .move_up(0, |_| async {
                calls.set(calls.get() + 1);
                Ok::<_, TestError>(())
            })
            .await;
        let down = list
            .move_down(2, |_| async {
                calls.set(calls.get() + 1);
                Ok::<_, TestError>(())
            })
            .await;

        assert_eq!(up, Ok(Change::Unchanged));
        assert_eq!(down, Ok(Change::Unchanged));
        assert_eq!(calls.get(), 0);
        assert_eq!(names(list.pages()), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_move_persists_dense_order() {
        let mut list = PageList::new(vec![node("A"), node("B"), node("C")]);
        let expected = vec![list.pages()[1].id, list.pages()[0].id, list.pages()[2].id];

        let result = list
            .move_down(0, |order| {
                let expected = expected.clone();
                async move {
                    assert_eq!(order, expected);
                    Ok::<_, TestError>(())
                }
            })
            .await;

        assert_eq!(result, Ok(Change::Applied));
        assert_eq!(names(list.pages()), vec!["B", "A", "C"]);
    }

    #[tokio::test]
    async fn test_failed_reorder_rolls_back() {
        let mut list = PageList::new(vec![node("A"), node("B"), node("C")]);

        list.move_up(2, |_| async { Ok::<_, TestError>(()) })
            .await
            .unwrap();
        assert_eq!(names(list.pages()), vec!["A", "C", "B"]);

        let result = list.move_up(1, |_| async { Err(TestError::Persist) }).await;
        assert_eq!(result, Err(TestError::Persist));
        assert_eq!(names(list.pages()), vec!["A", "C", "B"]);
    }

    #[tokio::test]
    async fn test_move_out_of_range_is_an_error() {
        let mut list = PageList::new(vec![node("A")]);
        let result = list.move_down(3, |_| async { Ok::<_, TestError>(()) }).await;
        assert_eq!(
            result,
            Err(TestError::Hierarchy(HierarchyError::IndexOutOfRange(3)))
        );
    }

    #[tokio::test]
    async fn test_nest_first_page_is_noop() {
        let mut list = PageList::new(vec![node("A"), node("B")]);
        let result = list
            .nest(0, |_, _| async { Err::<(), _>(TestError::Persist) })
            .await;
        assert_eq!(result, Ok(Change::Unchanged));
        assert!(list.pages().iter().all(|p| p.parent_id.is_none()));
    }

    #[tokio::test]
    async fn test_nest_under_top_level_page_above() {
        let a = node("A");
        let b = node("B");
        let mut list = PageList::new(vec![a.clone(), b.clone()]);

        let result = list
            .nest(1, |page, parent| {
                let (a_id, b_id) = (a.id, b.id);
                async move {
                    assert_eq!(page, b_id);
                    assert_eq!(parent, Some(a_id));
                    Ok::<_, TestError>(())
                }
            })
            .await;

        assert_eq!(result, Ok(Change::Applied));
        assert_eq!(display_names(&list), vec![("A", 0), ("B", 1)]);
    }

    #[tokio::test]
    async fn test_nest_below_child_becomes_sibling() {
        let a = node("A");
        let b = child_of("B", &a);
        let c = node("C");
        let mut list = PageList::new(vec![a.clone(), b, c.clone()]);

        list.nest(2, |_, _| async { Ok::<_, TestError>(()) })
            .await
            .unwrap();

        let c_now = list.pages().iter().find(|p| p.id == c.id).unwrap();
        assert_eq!(c_now.parent_id, Some(a.id));
        assert_eq!(display_names(&list), vec![("A", 0), ("B", 1), ("C", 1)]);
    }

    #[tokio::test]
    async fn test_nest_page_with_children_is_rejected() {
        let a = node("A");
        let b = node("B");
        let c = child_of("C", &b);
        let mut list = PageList::new(vec![a, b.clone(), c]);

        let result = list.nest(1, |_, _| async { Ok::<_, TestError>(()) }).await;
        assert_eq!(
            result,
            Err(TestError::Hierarchy(HierarchyError::HasChildren(b.id)))
        );
    }

    #[tokio::test]
    async fn test_failed_nest_leaves_state_untouched() {
        let mut list = PageList::new(vec![node("A"), node("B")]);
        let result = list.nest(1, |_, _| async { Err(TestError::Persist) }).await;
        assert_eq!(result, Err(TestError::Persist));
        assert_eq!(display_names(&list), vec![("A", 0), ("B", 0)]);
    }

    #[tokio::test]
    async fn test_unnest() {
        let a = node("A");
        let b = child_of("B", &a);
        let mut list = PageList::new(vec![a, b]);

        let noop = list
            .unnest(0, |_, _| async { Err::<(), _>(TestError::Persist) })
            .await;
        assert_eq!(noop, Ok(Change::Unchanged));

        let applied = list
            .unnest(1, |_, parent| async move {
                assert_eq!(parent, None);
                Ok::<_, TestError>(())
            })
            .await;
        assert_eq!(applied, Ok(Change::Applied));
        assert_eq!(display_names(&list), vec![("A", 0), ("B", 0)]);
    }

    #[test]
    fn test_positions() {
        let a = node("A");
        let b = node("B");
        let c = child_of("C", &a);
        let list = PageList::new(vec![a, b, c.clone()]);
        assert_eq!(list.position(c.id), Some(2));
        assert_eq!(list.display_position(c.id), Some(1));
    }
}
