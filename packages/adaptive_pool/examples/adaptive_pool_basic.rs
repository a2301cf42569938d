//! Basic usage example for `AdaptivePool`.
//!
//! This example simulates a small connection pool that shrinks while demand is low and grows
//! back once demand picks up, printing the pool's messages and `tracing` events as it goes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use adaptive_pool::AdaptivePool;

#[derive(Debug)]
struct Connection {
    id: usize,
    open: bool,
}

impl Connection {
    fn open(id: usize) -> Self {
        println!("opening connection {id}");
        Self { id, open: true }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Flipped by the "application" once demand increases.
    let busy_period = Arc::new(AtomicBool::new(false));

    let pool = AdaptivePool::builder()
        .initializer(|| (0..4).map(Connection::open).collect())
        .should_release({
            let busy_period = Arc::clone(&busy_period);
            move |active| !busy_period.load(Ordering::Relaxed) && active > 2
        })
        .can_restore({
            let busy_period = Arc::clone(&busy_period);
            move |active| busy_period.load(Ordering::Relaxed) && active < 4
        })
        .restore(|index| Some(Connection::open(index)))
        .release(|connection| {
            println!("closing connection {}", connection.id);
            connection.open = false;
        })
        .logger(|message| println!("pool says: {message}"))
        .build()
        .expect("initializer is infallible");

    println!("quiet period: {} idle", pool.idle_count());

    // While demand is low, requests shrink the pool down to two connections.
    while pool.acquire().is_none() {}
    println!(
        "after shrinking: {} active, {} released",
        pool.active_count(),
        pool.released_count()
    );

    busy_period.store(true, Ordering::Relaxed);

    // Demand picks up: the next acquire restores the released connections first.
    let leases: Vec<_> = std::iter::from_fn(|| pool.acquire()).collect();
    for lease in &leases {
        println!("using connection {} (open: {})", lease.id, lease.open);
    }

    println!("busy period: {} busy, {} idle", pool.busy_count(), pool.idle_count());

    for lease in leases {
        pool.release(lease);
    }

    println!("states: {:?}", pool.slot_states());
}
