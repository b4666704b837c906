//! In-process ranks: each rank is a thread, peers talk over channels.
//!
//! One unbounded FIFO channel exists per ordered `(src, dst)` pair, so sends
//! never block and messages between two ranks are received in the order they
//! were sent. Since every rank issues collectives in the same order, a plain
//! FIFO is enough to match messages without tags.
//!
//! A rank that panics or aborts drops its channel ends; any peer that later
//! waits on it panics too instead of hanging, so the whole run comes down.

use super::{BlockLayout, Comm, Element};
use std::any::Any;
use std::sync::mpsc::{self, Receiver, Sender};

type Packet = Box<dyn Any + Send>;

pub struct LocalComm {
    rank: usize,
    size: usize,
    /// `outbox[dst]` carries messages from this rank to `dst`.
    outbox: Vec<Sender<Packet>>,
    /// `inbox[src]` carries messages from `src` to this rank.
    inbox: Vec<Receiver<Packet>>,
}

impl LocalComm {
    /// Builds the communicators of a `size`-rank group, indexed by rank.
    pub fn universe(size: usize) -> Vec<LocalComm> {
        assert!(size > 0, "a run needs at least one rank");
        let mut outboxes: Vec<Vec<Sender<Packet>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut inboxes: Vec<Vec<Receiver<Packet>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();
        for src in 0..size {
            for dst in 0..size {
                let (tx, rx) = mpsc::channel();
                outboxes[src].push(tx);
                inboxes[dst].push(rx);
            }
        }
        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outbox, inbox))| LocalComm {
                rank,
                size,
                outbox,
                inbox,
            })
            .collect()
    }

    /// Runs `f` once per rank on its own thread and returns the results in rank order.
    ///
    /// A panic on any rank is re-raised here after all threads have stopped.
    pub fn run<R, F>(size: usize, f: F) -> Vec<R>
    where
        F: Fn(LocalComm) -> R + Sync,
        R: Send,
    {
        let comms = LocalComm::universe(size);
        std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    let f = &f;
                    s.spawn(move || f(comm))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(r) => r,
                    Err(payload) => std::panic::resume_unwind(payload),
                })
                .collect()
        })
    }

    fn post<T: Element>(&self, dst: usize, data: Vec<T>) {
        if self.outbox[dst].send(Box::new(data)).is_err() {
            panic!("rank {}: peer {dst} has left the run", self.rank);
        }
    }

    fn take<T: Element>(&self, src: usize) -> Vec<T> {
        let packet = match self.inbox[src].recv() {
            Ok(p) => p,
            Err(_) => panic!("rank {}: peer {src} has left the run", self.rank),
        };
        match packet.downcast::<Vec<T>>() {
            Ok(v) => *v,
            Err(_) => panic!("rank {}: unexpected message type from peer {src}", self.rank),
        }
    }
}

impl Comm for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) {
        for dst in 0..self.size {
            self.post::<u8>(dst, Vec::new());
        }
        for src in 0..self.size {
            self.take::<u8>(src);
        }
    }

    fn all_to_all<T: Element>(&self, send: &[T]) -> Vec<T> {
        assert_eq!(send.len(), self.size, "all_to_all needs one element per rank");
        for (dst, &v) in send.iter().enumerate() {
            self.post(dst, vec![v]);
        }
        (0..self.size)
            .map(|src| {
                let v: Vec<T> = self.take(src);
                assert_eq!(v.len(), 1, "all_to_all message from {src} is malformed");
                v[0]
            })
            .collect()
    }

    fn all_to_all_varcount<T: Element>(
        &self,
        send: &[T],
        send_layout: &BlockLayout,
        recv: &mut [T],
        recv_layout: &BlockLayout,
    ) {
        assert_eq!(send_layout.ranks(), self.size);
        assert_eq!(recv_layout.ranks(), self.size);
        // every pair talks, including empty segments
        for dst in 0..self.size {
            self.post(dst, send[send_layout.segment(dst)].to_vec());
        }
        for src in 0..self.size {
            let data: Vec<T> = self.take(src);
            let seg = recv_layout.segment(src);
            assert_eq!(
                data.len(),
                seg.len(),
                "rank {}: rank {src} sent {} values, expected {}",
                self.rank,
                data.len(),
                seg.len()
            );
            recv[seg].copy_from_slice(&data);
        }
    }

    fn exchange_halo<T: Element>(
        &self,
        send: &[T],
        send_layout: &BlockLayout,
        recv: &mut [T],
        recv_layout: &BlockLayout,
    ) {
        // sends are buffered by the channel, so posting them first cannot deadlock
        for (dst, range) in send_layout.segments() {
            self.post(dst, send[range].to_vec());
        }
        for (src, slot) in recv_layout.split_mut(recv) {
            let data: Vec<T> = self.take(src);
            assert_eq!(
                data.len(),
                slot.len(),
                "rank {}: halo from {src} has {} values, expected {}",
                self.rank,
                data.len(),
                slot.len()
            );
            slot.copy_from_slice(&data);
        }
    }

    fn broadcast<T: Element>(&self, buf: &mut Vec<T>, root: usize) {
        if self.rank == root {
            for dst in (0..self.size).filter(|&d| d != root) {
                self.post(dst, buf.clone());
            }
        } else {
            *buf = self.take(root);
        }
    }

    fn all_reduce_sum(&self, x: f64) -> f64 {
        for dst in 0..self.size {
            self.post(dst, vec![x]);
        }
        // sum in rank order so every rank gets the same bits
        (0..self.size).map(|src| self.take::<f64>(src)[0]).sum()
    }

    fn abort(&self, code: i32) -> ! {
        panic!("rank {} aborted the run (code {code})", self.rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_to_all_transposes() {
        let out = LocalComm::run(3, |comm| {
            let r = comm.rank();
            let send: Vec<usize> = (0..3).map(|d| 10 * r + d).collect();
            comm.all_to_all(&send)
        });
        assert_eq!(out[0], vec![0, 10, 20]);
        assert_eq!(out[1], vec![1, 11, 21]);
        assert_eq!(out[2], vec![2, 12, 22]);
    }

    #[test]
    fn varcount_moves_segments() {
        // rank r sends r+1 copies of r to every rank
        let out = LocalComm::run(3, |comm| {
            let r = comm.rank();
            let send_layout = BlockLayout::from_counts(vec![r + 1; 3]);
            let send = vec![r; send_layout.total];
            let recv_layout = BlockLayout::from_counts((0..3).map(|s| s + 1).collect());
            let mut recv = vec![usize::MAX; recv_layout.total];
            comm.all_to_all_varcount(&send, &send_layout, &mut recv, &recv_layout);
            recv
        });
        for recv in out {
            assert_eq!(recv, vec![0, 1, 1, 2, 2, 2]);
        }
    }

    #[test]
    fn halo_exchange_ring() {
        let out = LocalComm::run(4, |comm| {
            let r = comm.rank();
            let next = (r + 1) % 4;
            let prev = (r + 3) % 4;
            let mut send_counts = vec![0; 4];
            send_counts[next] = 2;
            let mut recv_counts = vec![0; 4];
            recv_counts[prev] = 2;
            let send = vec![r as f64, r as f64 + 0.5];
            let mut recv = vec![0.0; 2];
            comm.exchange_halo(
                &send,
                &BlockLayout::from_counts(send_counts),
                &mut recv,
                &BlockLayout::from_counts(recv_counts),
            );
            recv
        });
        assert_eq!(out[0], vec![3.0, 3.5]);
        assert_eq!(out[2], vec![1.0, 1.5]);
    }

    #[test]
    fn broadcast_and_reduce() {
        let out = LocalComm::run(3, |comm| {
            let mut buf = if comm.rank() == 1 { vec![7u64, 8, 9] } else { Vec::new() };
            comm.broadcast(&mut buf, 1);
            comm.barrier();
            (buf, comm.all_reduce_sum(comm.rank() as f64))
        });
        for (buf, sum) in out {
            assert_eq!(buf, vec![7, 8, 9]);
            assert_eq!(sum, 3.0);
        }
    }

    #[test]
    #[should_panic(expected = "aborted")]
    fn abort_brings_down_the_run() {
        LocalComm::run(2, |comm| {
            if comm.rank() == 0 {
                comm.abort(3);
            }
            comm.barrier();
        });
    }
}
