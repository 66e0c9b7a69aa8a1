use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

/// Write end of a one-shot hand-off.
///
/// The slot holds a single value. The first successful `deliver` fills it;
/// later deliveries, from this handle or any clone, are dropped. Delivery
/// after the receiver has gone away is dropped too.
#[derive(Debug)]
pub struct DeliverySlot<T> {
    tx: SyncSender<T>,
}

impl<T> Clone for DeliverySlot<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Create a slot and the receiver that waits on it
pub fn delivery_slot<T>() -> (DeliverySlot<T>, Receiver<T>) {
    let (tx, rx) = sync_channel(1);
    (DeliverySlot { tx }, rx)
}

impl<T> DeliverySlot<T> {
    /// Returns false when the value was discarded
    pub fn deliver(&self, value: T) -> bool {
        self.tx.try_send(value).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_delivery_wins() {
        let (slot, rx) = delivery_slot();
        let other = slot.clone();

        assert!(slot.deliver("submit"));
        assert!(!other.deliver("close"));
        assert!(!slot.deliver("stop"));

        assert_eq!(rx.recv().unwrap(), "submit");
        assert!(rx.recv_timeout(Duration::from_millis(20)).is_err());
    }

    #[test]
    fn test_delivery_after_receiver_dropped_is_discarded() {
        let (slot, rx) = delivery_slot::<u32>();
        drop(rx);
        assert!(!slot.deliver(1));
    }

    #[test]
    fn test_dropping_all_slots_disconnects() {
        let (slot, rx) = delivery_slot::<u32>();
        drop(slot);
        assert!(rx.recv().is_err());
    }
}
