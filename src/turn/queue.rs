//! Shared order queue.
//!
//! Collection threads append parsed orders here concurrently. Each player's
//! orders keep the order in which that player sent them. Arrival order
//! across players depends on thread timing, so the closed queue is handed
//! out grouped by player id.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::board::{Order, PlayerId};

#[derive(Debug, Default)]
pub struct OrderQueue {
    orders: Mutex<Vec<Order>>,
}

impl OrderQueue {
    pub fn new() -> Self {
        OrderQueue::default()
    }

    /// Appends an order.
    pub fn push(&self, order: Order) {
        self.lock().push(order);
    }

    /// Removes every queued order from `player`, returning how many were
    /// dropped.
    pub fn withdraw(&self, player: PlayerId) -> usize {
        let mut orders = self.lock();
        let before = orders.len();
        orders.retain(|o| o.player() != player);
        before - orders.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Takes every queued order, leaving the queue empty. Orders come out
    /// grouped by player id, each player's in submission order.
    pub fn drain(&self) -> Vec<Order> {
        let mut orders = std::mem::take(&mut *self.lock());
        orders.sort_by_key(Order::player);
        orders
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panicking collection thread must not wedge the round.
    fn lock(&self) -> MutexGuard<'_, Vec<Order>> {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tech(player: usize) -> Order {
        Order::TechUpgrade {
            player: PlayerId(player),
        }
    }

    fn mv(player: usize, count: u32) -> Order {
        Order::Move {
            player: PlayerId(player),
            source: "a".to_string(),
            dest: "b".to_string(),
            level: 0,
            count,
        }
    }

    #[test]
    fn drain_empties_queue() {
        let queue = OrderQueue::new();
        queue.push(tech(0));
        queue.push(tech(1));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.drain(), vec![tech(0), tech(1)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn withdraw_removes_only_that_player() {
        let queue = OrderQueue::new();
        queue.push(tech(0));
        queue.push(mv(1, 1));
        queue.push(mv(0, 2));
        assert_eq!(queue.withdraw(PlayerId(0)), 2);
        assert_eq!(queue.drain(), vec![mv(1, 1)]);
        assert_eq!(queue.withdraw(PlayerId(5)), 0);
    }

    #[test]
    fn concurrent_pushes_keep_per_player_order() {
        let queue = OrderQueue::new();
        std::thread::scope(|s| {
            for player in 0..4 {
                let queue = &queue;
                s.spawn(move || {
                    for count in 1..=50 {
                        queue.push(mv(player, count));
                    }
                });
            }
        });

        let orders = queue.drain();
        assert_eq!(orders.len(), 200);
        for player in 0..4 {
            let counts: Vec<u32> = orders
                .iter()
                .filter(|o| o.player() == PlayerId(player))
                .map(|o| match o {
                    Order::Move { count, .. } => *count,
                    _ => unreachable!(),
                })
                .collect();
            assert_eq!(counts, (1..=50).collect::<Vec<_>>());
        }
        let players: Vec<usize> = orders.iter().map(|o| o.player().0).collect();
        assert!(players.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn drain_groups_orders_by_player() {
        let queue = OrderQueue::new();
        queue.push(mv(2, 1));
        queue.push(tech(0));
        queue.push(mv(2, 2));
        queue.push(mv(1, 3));
        queue.push(mv(0, 4));
        assert_eq!(queue.drain(), vec![tech(0), mv(0, 4), mv(1, 3), mv(2, 1), mv(2, 2)]);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let queue = OrderQueue::new();
        let _ = std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = queue.orders.lock().unwrap();
                panic!("collection thread died");
            })
            .join()
        });
        queue.push(tech(0));
        assert_eq!(queue.len(), 1);
    }
}
