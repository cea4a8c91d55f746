use chrono::{DateTime, Utc};
use sea_orm::Order;
use sea_orm::sea_query::{Condition, Expr, ExprTrait, Func, SimpleExpr};
use sea_orm::ColumnTrait;

use crate::entities::task;

/// Optional list predicates, combined as one conjunction. `status` is kept as
/// a raw string on purpose: an unknown value matches nothing instead of
/// failing the request.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub entity_name: Option<String>,
    pub task_type: Option<String>,
    pub status: Option<String>,
    pub contact_person: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl TaskFilter {
    pub fn condition(&self) -> Condition {
        Condition::all()
            .add_option(
                self.entity_name
                    .as_deref()
                    .map(|v| contains_ci(task::Column::EntityName, v)),
            )
            .add_option(
                self.task_type
                    .as_deref()
                    .map(|v| task::Column::TaskType.eq(v)),
            )
            .add_option(self.status.as_deref().map(|v| task::Column::Status.eq(v)))
            .add_option(
                self.contact_person
                    .as_deref()
                    .map(|v| contains_ci(task::Column::ContactPerson, v)),
            )
            .add_option(self.start_date.map(|v| task::Column::TaskTime.gte(v)))
            .add_option(self.end_date.map(|v| task::Column::TaskTime.lte(v)))
    }
}

// Case-insensitive substring match. LIKE metacharacters in the needle are
// passed through verbatim.
fn contains_ci(column: task::Column, needle: &str) -> SimpleExpr {
    Func::lower(Expr::col(column))
        .like(format!("%{}%", needle.to_lowercase()))
        .into()
}

/// Closed set of sortable fields. Unrecognized `sort_by` values resolve to
/// `Unsorted`, which leaves the store's iteration order untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    Id,
    #[default]
    CreatedDate,
    EntityName,
    TaskType,
    TaskTime,
    ContactPerson,
    Note,
    Status,
    Unsorted,
}

impl SortKey {
    pub fn resolve(name: &str) -> Self {
        match name {
            "id" => Self::Id,
            "created_date" => Self::CreatedDate,
            "entity_name" => Self::EntityName,
            "task_type" => Self::TaskType,
            "task_time" => Self::TaskTime,
            "contact_person" => Self::ContactPerson,
            "note" => Self::Note,
            "status" => Self::Status,
            _ => Self::Unsorted,
        }
    }

    pub fn column(self) -> Option<task::Column> {
        match self {
            Self::Id => Some(task::Column::Id),
            Self::CreatedDate => Some(task::Column::CreatedDate),
            Self::EntityName => Some(task::Column::EntityName),
            Self::TaskType => Some(task::Column::TaskType),
            Self::TaskTime => Some(task::Column::TaskTime),
            Self::ContactPerson => Some(task::Column::ContactPerson),
            Self::Note => Some(task::Column::Note),
            Self::Status => Some(task::Column::Status),
            Self::Unsorted => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortDirective {
    pub key: SortKey,
    pub order: Order,
}

impl Default for SortDirective {
    fn default() -> Self {
        Self {
            key: SortKey::CreatedDate,
            order: Order::Desc,
        }
    }
}

impl SortDirective {
    /// Only the literal string `"asc"` sorts ascending; any other
    /// `sort_order` value, present or not, sorts descending.
    pub fn from_params(sort_by: Option<&str>, sort_order: Option<&str>) -> Self {
        let key = sort_by.map(SortKey::resolve).unwrap_or_default();
        let order = match sort_order {
            Some("asc") => Order::Asc,
            _ => Order::Desc,
        };
        Self { key, order }
    }
}
