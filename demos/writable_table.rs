//! Writable table: UPDATE and DELETE flow back into host storage, with a
//! pre-mutation hook (the place to create an undo point).
//!
//! Run with: `cargo run --example writable_table`

use livetab::{table, Database};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Task {
    title: String,
    done: i64,
}

fn main() -> livetab::Result<()> {
    let tasks = Arc::new(Mutex::new(vec![
        Task {
            title: "write the report".to_string(),
            done: 0,
        },
        Task {
            title: "ship the release".to_string(),
            done: 0,
        },
    ]));

    let tasks_count = Arc::clone(&tasks);
    let tasks_title = Arc::clone(&tasks);
    let tasks_done_get = Arc::clone(&tasks);
    let tasks_done_set = Arc::clone(&tasks);
    let tasks_delete = Arc::clone(&tasks);

    let def = table("tasks")
        .count(move || tasks_count.lock().len())
        .on_modify(|op| println!("[hook] {op}"))
        .column_text("title", move |i| tasks_title.lock()[i].title.clone())
        .column_int64_rw(
            "done",
            move |i| tasks_done_get.lock()[i].done,
            move |i, value| {
                if let Some(task) = tasks_done_set.lock().get_mut(i) {
                    task.done = value;
                    true
                } else {
                    false
                }
            },
        )
        .deletable(move |i| {
            let mut tasks = tasks_delete.lock();
            if i < tasks.len() {
                tasks.remove(i);
                true
            } else {
                false
            }
        })
        .build();

    let db = Database::open_in_memory()?;
    db.register_and_create_table(&def);

    db.exec("UPDATE tasks SET done = 1 WHERE title LIKE 'write%'")?;
    db.exec("DELETE FROM tasks WHERE done = 1")?;

    for task in tasks.lock().iter() {
        println!("remaining: {} (done={})", task.title, task.done);
    }
    Ok(())
}
