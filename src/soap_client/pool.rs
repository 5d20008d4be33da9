//! Connection pool for TCP connections to the RealFlight simulator.
//!
//! The RealFlight SoapServer requires a new connection for each request.
//! This pool pre-creates connections in the background to hide latency.

use std::{
    io,
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use log::{debug, error, info};

use crate::StatisticsEngine;
use crate::TransportError;
use crate::configuration::Configuration;

/// Pre-creates TCP connections in a background thread to hide connection latency.
///
/// While the simulator is unreachable the worker keeps retrying, so a request made
/// after the simulator comes up succeeds without rebuilding the pool.
pub(crate) struct ConnectionPool {
    next_socket: Receiver<TcpStream>,
    creator_thread: Option<thread::JoinHandle<()>>,
    running: Arc<AtomicBool>,
    last_error: Arc<Mutex<Option<String>>>,
    wait_timeout: Duration,
}

impl ConnectionPool {
    pub fn new(
        config: &Configuration,
        statistics: Arc<StatisticsEngine>,
    ) -> Result<Self, TransportError> {
        let address = resolve(&config.simulator_host)?;
        let (sender, receiver) = bounded(config.pool_size.max(1));

        let mut pool = ConnectionPool {
            next_socket: receiver,
            creator_thread: None,
            running: Arc::new(AtomicBool::new(true)),
            last_error: Arc::new(Mutex::new(None)),
            wait_timeout: config.request_timeout,
        };

        pool.start_worker(address, config.connect_timeout, sender, statistics)?;

        Ok(pool)
    }

    // Start the background thread that creates new connections
    fn start_worker(
        &mut self,
        address: SocketAddr,
        connect_timeout: Duration,
        sender: Sender<TcpStream>,
        statistics: Arc<StatisticsEngine>,
    ) -> Result<(), TransportError> {
        let running = Arc::clone(&self.running);
        let last_error = Arc::clone(&self.last_error);

        let worker = thread::Builder::new().name("connection-pool".to_string());
        let handle = worker.spawn(move || {
            debug!("Connection pool targeting {}.", address);

            while running.load(Ordering::Relaxed) {
                if sender.is_full() {
                    thread::sleep(connect_timeout / 2);
                    continue;
                }

                match TcpStream::connect_timeout(&address, connect_timeout) {
                    Ok(stream) => {
                        if let Ok(mut guard) = last_error.lock()
                            && guard.take().is_some()
                        {
                            info!("Simulator at {} is reachable again.", address);
                        }
                        if let Err(e) = sender.send(stream) {
                            error!("Error queueing connection: {}", e);
                            statistics.increment_error_count();
                            break;
                        }
                    }
                    Err(e) => {
                        let msg = format!("Failed to connect to simulator at {}: {}", address, e);
                        if let Ok(mut guard) = last_error.lock() {
                            // Only the first failure of a streak is logged.
                            if guard.as_deref() != Some(msg.as_str()) {
                                error!("{}", msg);
                            }
                            *guard = Some(msg);
                        }
                        statistics.increment_error_count();
                        thread::sleep(connect_timeout);
                    }
                }
            }

            debug!("Connection pool worker stopped.");
        })?;

        self.creator_thread = Some(handle);
        Ok(())
    }

    /// Takes the next connection, waiting up to the request timeout for one.
    pub fn get_connection(&self) -> Result<TcpStream, TransportError> {
        match self.next_socket.recv_timeout(self.wait_timeout) {
            Ok(stream) => Ok(stream),
            Err(RecvTimeoutError::Timeout) => Err(TransportError::Unavailable {
                waited: self.wait_timeout,
                reason: self
                    .last_error()
                    .unwrap_or_else(|| "no connection became ready".to_string()),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Unavailable {
                waited: Duration::ZERO,
                reason: "connection pool worker has stopped".to_string(),
            }),
        }
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|g| g.clone())
    }
}

fn resolve(host: &str) -> Result<SocketAddr, TransportError> {
    host.to_socket_addrs()?.next().ok_or_else(|| {
        TransportError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("simulator host '{}' did not resolve to an address", host),
        ))
    })
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        // Signal the creator thread to stop
        self.running.store(false, Ordering::Relaxed);

        // Wait for the creator thread to finish
        if let Some(handle) = self.creator_thread.take() {
            let _ = handle.join();
        }
    }
}
