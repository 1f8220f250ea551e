use crate::queue::BoundedQueue;
use crate::stats::MapReport;
use std::thread::ScopedJoinHandle;
use tracing::{info, warn};

struct Producer<'scope> {
    worker: usize,
    source: String,
    handle: ScopedJoinHandle<'scope, MapReport>,
}

/// Joins every map worker, then closes every partition queue.
///
/// Consuming `finish` makes the broadcast happen once, and only after the last
/// producer has been joined, so a reducer can never see an empty closed queue
/// while a map worker could still enqueue into it.
pub struct TerminationCoordinator<'scope, 'q, T> {
    producers: Vec<Producer<'scope>>,
    queues: &'q [BoundedQueue<T>],
}

impl<'scope, 'q, T> TerminationCoordinator<'scope, 'q, T> {
    pub fn new(queues: &'q [BoundedQueue<T>]) -> Self {
        Self { producers: Vec::new(), queues }
    }

    pub fn register(&mut self, worker: usize, source: impl Into<String>, handle: ScopedJoinHandle<'scope, MapReport>) {
        self.producers.push(Producer { worker, source: source.into(), handle });
    }

    pub fn producers(&self) -> usize { self.producers.len() }

    pub fn finish(self) -> Vec<MapReport> {
        let mut reports = Vec::with_capacity(self.producers.len());
        for Producer { worker, source, handle } in self.producers {
            match handle.join() {
                Ok(report) => reports.push(report),
                Err(_) => {
                    warn!(worker, source = %source, "map worker panicked");
                    reports.push(MapReport::panicked(worker, source));
                }
            }
        }
        info!(producers = reports.len(), partitions = self.queues.len(), "all map workers joined, broadcasting shutdown");
        for queue in self.queues {
            queue.close_for_shutdown();
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::Dequeued;
    use crate::stats::MapOutcome;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn closes_queues_only_after_all_producers_finish() {
        let queues: Vec<BoundedQueue<u32>> = (0..2).map(|p| BoundedQueue::new(p, 1)).collect();
        let (reports, received) = thread::scope(|s| {
            let consumers: Vec<_> = queues
                .iter()
                .map(|q| {
                    s.spawn(move || {
                        let mut n = 0;
                        while let Dequeued::Item(_) = q.get() {
                            n += 1;
                        }
                        n
                    })
                })
                .collect();

            let mut coordinator = TerminationCoordinator::new(&queues);
            for worker in 0..3 {
                let queues = &queues;
                let handle = s.spawn(move || {
                    // slow producers: the broadcast must still wait for them
                    for i in 0..10u32 {
                        queues[(i as usize + worker) % 2].put(i).unwrap();
                        thread::sleep(Duration::from_millis(1));
                    }
                    MapReport { records: 10, ..MapReport::new(worker, format!("p{worker}")) }
                });
                coordinator.register(worker, format!("p{worker}"), handle);
            }
            assert_eq!(coordinator.producers(), 3);
            let reports = coordinator.finish();
            assert!(queues.iter().all(|q| q.is_closed()));
            let received: usize = consumers.into_iter().map(|c| c.join().unwrap()).sum();
            (reports, received)
        });

        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r.outcome.is_completed()));
        assert_eq!(received, 30);
    }

    #[test]
    fn panicked_producer_still_releases_reducers() {
        let queues: Vec<BoundedQueue<u8>> = vec![BoundedQueue::new(0, 2)];
        let (reports, last) = thread::scope(|s| {
            let consumer = s.spawn(|| queues[0].get());
            let mut coordinator = TerminationCoordinator::new(&queues);
            let handle = s.spawn(|| -> MapReport { panic!("boom") });
            coordinator.register(0, "bad", handle);
            (coordinator.finish(), consumer.join().unwrap())
        });
        assert_eq!(last, Dequeued::Shutdown);
        assert!(matches!(reports[0].outcome, MapOutcome::Aborted { .. }));
        assert_eq!(reports[0].source, "bad");
    }

    #[test]
    fn no_producers_closes_immediately() {
        let queues: Vec<BoundedQueue<u8>> = (0..3).map(|p| BoundedQueue::new(p, 1)).collect();
        let reports = thread::scope(|_| TerminationCoordinator::new(&queues).finish());
        assert!(reports.is_empty());
        assert!(queues.iter().all(|q| q.is_closed() && q.get() == Dequeued::Shutdown));
    }
}
