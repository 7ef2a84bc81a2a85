//! End-to-end join pipeline: users joined to their orders, maintained
//! incrementally while rows arrive and retract.
//!
//! Run with `RUST_LOG=zinc=trace` to watch the scheduler assign indices and
//! drain each step.

use zinc::view::InputRelation;
use zinc::Graph;

fn main() -> Result<(), zinc::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let graph = Graph::new();
    let users: InputRelation<u32, String> = graph.input_relation();
    let orders: InputRelation<u32, String> = graph.input_relation();

    // Every (user, order) pair agreeing on the user id, updated per step
    // from the deltas alone.
    let placed = users.join(&orders);
    let big_spenders = placed.filter(|(_, order)| order.contains("deluxe"));

    graph.after_step(|| println!("-- step --"));

    users.add(1, "alice".into(), 1);
    users.add(2, "bob".into(), 1);
    orders.add(1, "standard widget".into(), 1);
    orders.add(2, "deluxe widget".into(), 1);
    graph.step()?;
    println!("placed:  {:?}", placed.snapshot());
    println!("deluxe:  {:?}", big_spenders.snapshot());

    // Retraction flows through the same delta rule.
    orders.remove(2, "deluxe widget".into(), 1);
    graph.step()?;
    println!("deluxe after retraction: {:?}", big_spenders.snapshot());
    println!("delta this step: {:?}", placed.changes().get());

    Ok(())
}
