use serde::Serialize;

use super::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,  // always >= 1, checked at the boundary
}

impl PageRequest {
    pub fn new(page: usize, size: usize) -> Self {
        Self { page, size: size.max(1) }
    }

    fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Deadline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for TaskSort {
    fn default() -> Self {
        Self { field: SortField::CreatedAt, direction: SortDirection::Desc }
    }
}

impl TaskSort {
    pub fn apply(&self, tasks: &mut [Task]) {
        tasks.sort_by(|a, b| {
            let ordering = match self.field {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::Deadline => a.deadline.cmp(&b.deadline),
            }
            .then_with(|| a.id.cmp(&b.id));

            match self.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPageRequest {
    pub page: PageRequest,
    pub sort: TaskSort,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_next: bool,
}

impl<T> Page<T> {
    /// Slices an already ordered collection.
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total_items = all.len();
        let total_pages = total_items.div_ceil(request.size);
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.size)
            .collect();

        Self {
            items,
            page: request.page,
            total_items,
            total_pages,
            has_next: request.page.saturating_add(1) < total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            total_items: self.total_items,
            total_pages: self.total_pages,
            has_next: self.has_next,
        }
    }
}
