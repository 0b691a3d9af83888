//! Task list composite
//!
//! A non-isolated list of rows. Rows are added with [`add_task`] (or the
//! list's `add` event), removed by their own delete button, and dropped all
//! at once by the list's `clear` event.
//!
//! Each [`TaskRow`] is an isolated composite built in `init` from its
//! `label`/`done` properties:
//!
//! ```text
//! [checkbox] [label] [edit field] [edit] [save] [delete]
//! ```
//!
//! The edit field and save button start hidden. Toggling the checkbox syncs
//! the row's `done` and greys the label; edit and save swap which half is
//! visible. All of these update the row only.
//!
//! # Example
//!
//! ```ignore
//! runtime.with_tree(|tree| {
//!     add_task(tree, list, "milk")?;
//!     add_task(tree, list, "eggs")?;
//!     tree.update(list); // one patch for both rows
//!     Ok(())
//! })?;
//! ```

use std::cell::OnceCell;
use std::rc::Rc;

use trellis_core::{
    ControlBehavior, ControlContext, ControlId, ControlSpec, ControlTree, PropValue,
    PropertySchema,
};

use super::button::button;
use super::checkbox::checkbox;
use super::text::text;
use super::text_field::{field_value, text_field};

pub const LIST_KIND: &str = "task_list";
pub const ROW_KIND: &str = "task_row";

const DONE_COLOR: &str = "grey_500";

/// Behavior of a task list: one row per entry of its `items` property
#[derive(Default)]
pub struct TaskList;

impl ControlBehavior for TaskList {
    fn init(&mut self, cx: &mut ControlContext<'_>) -> anyhow::Result<()> {
        let items: Vec<String> = cx
            .get("items")
            .and_then(PropValue::as_list)
            .map(|items| items.iter().map(|item| item.to_string()).collect())
            .unwrap_or_default();

        for label in items {
            cx.create_child(task_row(label, false))?;
        }
        Ok(())
    }
}

/// Ids of a row's synthesized children
#[derive(Clone, Copy, Debug)]
struct RowParts {
    row: ControlId,
    checkbox: ControlId,
    label: ControlId,
    field: ControlId,
    edit: ControlId,
    save: ControlId,
}

/// Behavior of a task row
#[derive(Default)]
pub struct TaskRow {
    parts: Rc<OnceCell<RowParts>>,
}

type RowHandler = fn(&mut ControlContext<'_>, RowParts, &PropValue) -> anyhow::Result<()>;

/// Wrap a row handler so it runs with the row's parts once they exist
fn row_handler(
    parts: Rc<OnceCell<RowParts>>,
    f: RowHandler,
) -> impl Fn(&mut ControlContext<'_>, &PropValue) -> anyhow::Result<()> + 'static {
    move |cx, payload| match parts.get() {
        Some(parts) => f(cx, *parts, payload),
        None => Ok(()),
    }
}

impl ControlBehavior for TaskRow {
    fn init(&mut self, cx: &mut ControlContext<'_>) -> anyhow::Result<()> {
        let row = cx.id();
        let label_text = cx.prop_str("label").unwrap_or_default();
        let done = cx.prop_bool("done").unwrap_or(false);
        let handler = |f: RowHandler| row_handler(self.parts.clone(), f);

        let checkbox = cx.create(checkbox("", done).on("toggle", handler(toggle_done)));
        let label = cx.create(text(label_text.clone()).prop("color", label_color(done)));
        let field = cx.create(text_field(label_text).prop("visible", false));
        let edit = cx.create(button("edit").on("click", handler(start_edit)));
        let save = cx.create(
            button("save")
                .prop("visible", false)
                .on("click", handler(save_edit)),
        );
        let delete = cx.create(button("delete").on("click", |cx, _| {
            let Some(row) = cx.ancestor_of_kind(ROW_KIND) else {
                return Ok(());
            };
            let Some(list) = cx.tree().parent(row) else {
                return Ok(());
            };
            cx.tree().remove_child(list, row)?;
            cx.update_control(list);
            Ok(())
        }));

        for child in [checkbox, label, field, edit, save, delete] {
            cx.add_child(child)?;
        }

        let parts = RowParts {
            row,
            checkbox,
            label,
            field,
            edit,
            save,
        };
        if self.parts.set(parts).is_err() {
            tracing::warn!(row = %row, "task row built twice");
        }
        Ok(())
    }
}

fn label_color(done: bool) -> PropValue {
    if done {
        PropValue::from(DONE_COLOR)
    } else {
        PropValue::Null
    }
}

fn toggle_done(
    cx: &mut ControlContext<'_>,
    parts: RowParts,
    payload: &PropValue,
) -> anyhow::Result<()> {
    let done = match payload.as_bool() {
        Some(explicit) => explicit,
        None => !cx
            .get_on(parts.checkbox, "checked")
            .and_then(PropValue::as_bool)
            .unwrap_or(false),
    };

    cx.set_on(parts.checkbox, "checked", done)?;
    cx.set_on(parts.row, "done", done)?;
    cx.set_on(parts.label, "color", label_color(done))?;
    cx.update_control(parts.row);
    tracing::debug!(row = %parts.row, done, "task toggled");
    Ok(())
}

fn show_editor(cx: &mut ControlContext<'_>, parts: RowParts, editing: bool) -> anyhow::Result<()> {
    cx.set_on(parts.label, "visible", !editing)?;
    cx.set_on(parts.field, "visible", editing)?;
    cx.set_on(parts.edit, "visible", !editing)?;
    cx.set_on(parts.save, "visible", editing)?;
    Ok(())
}

fn start_edit(cx: &mut ControlContext<'_>, parts: RowParts, _: &PropValue) -> anyhow::Result<()> {
    show_editor(cx, parts, true)?;
    cx.update_control(parts.row);
    Ok(())
}

fn save_edit(cx: &mut ControlContext<'_>, parts: RowParts, _: &PropValue) -> anyhow::Result<()> {
    let value = field_value(cx.get_on(parts.field, "value"));

    cx.set_on(parts.row, "label", value.clone())?;
    cx.set_on(parts.label, "text", value)?;
    show_editor(cx, parts, false)?;
    cx.update_control(parts.row);
    Ok(())
}

/// A list pre-populated with `items`
pub fn task_list<I, S>(items: I) -> ControlSpec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let items: Vec<PropValue> = items.into_iter().map(|s| PropValue::from(s.into())).collect();

    ControlSpec::composite(LIST_KIND, TaskList)
        .schema(PropertySchema::new().prop("items", PropValue::List(Vec::new())))
        .prop("items", items)
        .on("add", |cx, payload| {
            let label = payload.to_string();
            let label = label.trim();
            if label.is_empty() {
                return Ok(());
            }
            cx.create_child(task_row(label, false))?;
            cx.update();
            Ok(())
        })
        .on("clear", |cx, _| {
            let list = cx.id();
            cx.tree().clear_children(list)?;
            cx.update();
            tracing::debug!(list = %list, "tasks cleared");
            Ok(())
        })
}

/// An isolated row; see the module docs for its layout
pub fn task_row(label: impl Into<String>, done: bool) -> ControlSpec {
    ControlSpec::composite(ROW_KIND, TaskRow::default())
        .isolated(true)
        .schema(PropertySchema::new().prop("label", "").prop("done", false))
        .prop("label", label.into())
        .prop("done", done)
}

/// Append a row to `list` without rendering; call `update` to push it
pub fn add_task(
    tree: &mut ControlTree,
    list: ControlId,
    label: impl Into<String>,
) -> trellis_core::Result<ControlId> {
    let row = tree.create(task_row(label, false));
    tree.add_child(list, row)?;
    tracing::debug!(list = %list, row = %row, "task added");
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{LifecycleState, RecordingRenderer, Runtime};

    /// Children of the first row: checkbox, label, field, edit, save, delete
    fn first_row(runtime: &Runtime, list: ControlId) -> (ControlId, Vec<ControlId>) {
        runtime.inspect(|tree| {
            let row = tree.children(list)[0];
            (row, tree.children(row).to_vec())
        })
    }

    #[test]
    fn test_rows_built_from_items() {
        let runtime = Runtime::new(RecordingRenderer::new());
        let list = runtime.mount_root(task_list(["milk", "eggs"])).unwrap();

        runtime.inspect(|tree| {
            let rows = tree.children(list);
            assert_eq!(rows.len(), 2);
            assert_eq!(tree.prop(rows[1], "label"), Some(&PropValue::from("eggs")));
            assert!(tree.get(rows[0]).unwrap().is_isolated());

            let kinds: Vec<_> = tree
                .children(rows[0])
                .iter()
                .filter_map(|c| tree.kind_name(*c))
                .collect();
            assert_eq!(
                kinds,
                vec!["checkbox", "text", "text_field", "button", "button", "button"]
            );
            assert_eq!(tree.state(tree.children(rows[0])[0]), Some(LifecycleState::Mounted));
        });
    }

    #[test]
    fn test_delete_button_removes_its_row() {
        let recorder = RecordingRenderer::new();
        let runtime = Runtime::new(recorder.clone());
        let list = runtime.mount_root(task_list(["milk", "eggs"])).unwrap();
        let (row, parts) = first_row(&runtime, list);
        recorder.clear();

        runtime.dispatch_event(parts[5], "click", PropValue::Null).unwrap();

        assert_eq!(runtime.inspect(|tree| tree.children(list).len()), 1);
        assert_eq!(runtime.inspect(|tree| tree.state(row)), Some(LifecycleState::Disposed));
        let patch = recorder.last().unwrap();
        assert_eq!(patch.removed, vec![row]);
    }

    #[test]
    fn test_toggle_greys_the_label() {
        let runtime = Runtime::new(RecordingRenderer::new());
        let list = runtime.mount_root(task_list(["milk"])).unwrap();
        let (row, parts) = first_row(&runtime, list);

        runtime.dispatch_event(parts[0], "toggle", PropValue::Null).unwrap();
        runtime.inspect(|tree| {
            assert_eq!(tree.prop(row, "done"), Some(&PropValue::Bool(true)));
            assert_eq!(tree.prop(parts[1], "color"), Some(&PropValue::from(DONE_COLOR)));
        });

        runtime.dispatch_event(parts[0], "toggle", false).unwrap();
        runtime.inspect(|tree| {
            assert_eq!(tree.prop(row, "done"), Some(&PropValue::Bool(false)));
            assert_eq!(tree.prop(parts[1], "color"), Some(&PropValue::Null));
        });
    }

    #[test]
    fn test_add_event_appends_row() {
        let runtime = Runtime::new(RecordingRenderer::new());
        let list = runtime.mount_root(task_list(Vec::<String>::new())).unwrap();

        runtime.dispatch_event(list, "add", " bread ").unwrap();
        runtime.dispatch_event(list, "add", "   ").unwrap();

        runtime.inspect(|tree| {
            let rows = tree.children(list);
            assert_eq!(rows.len(), 1);
            assert_eq!(tree.prop(rows[0], "label"), Some(&PropValue::from("bread")));
        });
    }

    #[test]
    fn test_clear_event_drops_every_row() {
        let runtime = Runtime::new(RecordingRenderer::new());
        let list = runtime.mount_root(task_list(["milk", "eggs"])).unwrap();
        let rows = runtime.inspect(|tree| tree.children(list).to_vec());

        runtime.dispatch_event(list, "clear", PropValue::Null).unwrap();

        runtime.inspect(|tree| {
            assert!(tree.children(list).is_empty());
            for row in &rows {
                assert_eq!(tree.state(*row), Some(LifecycleState::Disposed));
            }
        });
    }
}
