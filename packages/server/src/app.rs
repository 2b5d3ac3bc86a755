//! Wiring of every broker component and its background tasks.

use std::{future::Future, sync::Arc, time::Duration};

use axum::Router;
use kakehashi_shared::time::Clock;
use tokio::{net::TcpListener, task::JoinHandle};

use crate::{
    config::{BrokerConfig, ConfigError},
    domain::TicketQueue,
    infrastructure::{
        message_pusher::{PusherRelay, WebSocketMessagePusher},
        presence::InMemoryPresenceRegistry,
        queue::InMemoryTicketQueue,
        repository::{InMemoryRoomRepository, InMemoryTicketRepository},
    },
    ui::{AppState, Server, shutdown_signal},
    usecase::{
        CancelTicketUseCase, ClaimTicketUseCase, CloseTicketUseCase, ConnectParticipantUseCase,
        DisconnectParticipantUseCase, DispatchTicketUseCase, EvictRoomsUseCase,
        GetRoomHistoryUseCase, GetRoomsUseCase, GetTicketUseCase, JoinRoomUseCase,
        ListOpenTicketsUseCase, SendMessageUseCase, SubmitTicketUseCase, TicketDispatcher,
    },
};

/// How long shutdown waits for dispatch workers to drain the queue
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The assembled broker
pub struct Application {
    config: BrokerConfig,
    queue: Arc<InMemoryTicketQueue>,
    state: Arc<AppState>,
    dispatcher: TicketDispatcher,
    evict_rooms_usecase: Arc<EvictRoomsUseCase>,
    dispatch_workers: Vec<JoinHandle<()>>,
    eviction_task: Option<JoinHandle<()>>,
}

impl Application {
    /// Validate the configuration and wire all components.
    ///
    /// Dependencies are created in order:
    /// 1. Stores (ticket registry, room store, presence registry) and the ticket queue
    /// 2. MessagePusher and Relay
    /// 3. UseCases
    /// 4. AppState
    pub fn build(config: BrokerConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;

        // 1. Stores
        let tickets = Arc::new(InMemoryTicketRepository::new());
        let rooms = Arc::new(InMemoryRoomRepository::with_room_capacity(
            config.room_capacity,
        ));
        let presence = Arc::new(InMemoryPresenceRegistry::new());
        let queue = Arc::new(InMemoryTicketQueue::new(
            config.queue_partitions,
            config.queue_partition_capacity,
        ));

        // 2. MessagePusher (WebSocket implementation) and Relay
        let message_pusher = Arc::new(WebSocketMessagePusher::new(presence.clone()));
        let relay = Arc::new(PusherRelay::new(message_pusher.clone()));

        // 3. UseCases
        let state = Arc::new(AppState {
            connect_participant_usecase: Arc::new(ConnectParticipantUseCase::new(
                presence.clone(),
                tickets.clone(),
                message_pusher.clone(),
                clock.clone(),
            )),
            disconnect_participant_usecase: Arc::new(DisconnectParticipantUseCase::new(
                presence.clone(),
                rooms.clone(),
                message_pusher.clone(),
                clock.clone(),
            )),
            submit_ticket_usecase: Arc::new(SubmitTicketUseCase::new(queue.clone(), clock.clone())),
            list_open_tickets_usecase: Arc::new(ListOpenTicketsUseCase::new(tickets.clone())),
            get_ticket_usecase: Arc::new(GetTicketUseCase::new(tickets.clone())),
            claim_ticket_usecase: Arc::new(ClaimTicketUseCase::new(
                tickets.clone(),
                rooms.clone(),
                presence.clone(),
                message_pusher.clone(),
                clock.clone(),
            )),
            close_ticket_usecase: Arc::new(CloseTicketUseCase::new(
                tickets.clone(),
                rooms.clone(),
                message_pusher.clone(),
                clock.clone(),
            )),
            cancel_ticket_usecase: Arc::new(CancelTicketUseCase::new(
                tickets.clone(),
                presence.clone(),
                message_pusher.clone(),
                clock.clone(),
            )),
            join_room_usecase: Arc::new(JoinRoomUseCase::new(
                rooms.clone(),
                presence.clone(),
                message_pusher.clone(),
                relay.clone(),
            )),
            send_message_usecase: Arc::new(SendMessageUseCase::new(
                rooms.clone(),
                relay,
                clock.clone(),
            )),
            get_rooms_usecase: Arc::new(GetRoomsUseCase::new(rooms.clone())),
            get_room_history_usecase: Arc::new(GetRoomHistoryUseCase::new(rooms.clone())),
            message_pusher: message_pusher.clone(),
        });

        let dispatch_usecase = Arc::new(DispatchTicketUseCase::new(
            tickets,
            presence,
            message_pusher,
        ));
        let dispatcher = TicketDispatcher::new(
            queue.clone(),
            dispatch_usecase,
            config.dispatch_retry_delay(),
        );
        let evict_rooms_usecase = Arc::new(EvictRoomsUseCase::new(
            rooms,
            clock,
            config.room_retention_millis(),
        ));

        Ok(Self {
            config,
            queue,
            state,
            dispatcher,
            evict_rooms_usecase,
            dispatch_workers: Vec::new(),
            eviction_task: None,
        })
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn router(&self) -> Router {
        Server::new(self.state.clone()).router()
    }

    /// Start one dispatch worker per queue partition and the eviction sweep.
    pub fn spawn_background(&mut self) {
        if !self.dispatch_workers.is_empty() {
            return;
        }
        self.dispatch_workers = self.dispatcher.spawn();
        tracing::info!(
            "Started {} dispatch worker(s) on topic ticket.created",
            self.dispatch_workers.len()
        );

        let usecase = self.evict_rooms_usecase.clone();
        let period = self.config.eviction_interval();
        self.eviction_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                usecase.execute().await;
            }
        }));
    }

    /// Bind to the configured address and serve until Ctrl+C / SIGTERM.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&bind_addr).await?;
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");
        self.serve(listener, shutdown_signal()).await?;
        Ok(())
    }

    /// Serve on `listener` until `shutdown` resolves, then stop the background tasks.
    pub async fn serve<F>(mut self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn_background();
        let result = Server::new(self.state.clone())
            .serve(listener, shutdown)
            .await;
        self.shutdown().await;
        result
    }

    /// Close the queue, let the dispatch workers drain it and stop the eviction sweep.
    pub async fn shutdown(&mut self) {
        self.queue.close();
        for mut worker in self.dispatch_workers.drain(..) {
            if tokio::time::timeout(DRAIN_TIMEOUT, &mut worker).await.is_err() {
                tracing::warn!("Dispatch worker did not drain in time, aborting");
                worker.abort();
            }
        }
        if let Some(task) = self.eviction_task.take() {
            task.abort();
        }
        tracing::info!("Background tasks stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kakehashi_shared::time::SystemClock;

    #[tokio::test]
    async fn test_build_rejects_invalid_config() {
        // テスト項目: 不正な設定ではアプリケーションを組み立てない
        // given (前提条件):
        let config = BrokerConfig {
            queue_partitions: 0,
            ..BrokerConfig::default()
        };

        // when (操作):
        let result = Application::build(config, Arc::new(SystemClock));

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(ConfigError::MustBePositive("queue_partitions"))
        ));
    }

    #[tokio::test]
    async fn test_background_tasks_stop_on_shutdown() {
        // テスト項目: パーティション数だけワーカーが起動し、shutdown で全て止まる
        // given (前提条件):
        let config = BrokerConfig {
            queue_partitions: 3,
            ..BrokerConfig::default()
        };
        let mut app = Application::build(config, Arc::new(SystemClock)).unwrap();

        // when (操作):
        app.spawn_background();
        let workers = app.dispatch_workers.len();
        app.shutdown().await;

        // then (期待する結果):
        assert_eq!(workers, 3);
        assert!(app.dispatch_workers.is_empty());
        assert!(app.eviction_task.is_none());
        assert_eq!(app.queue.next(0).await, None);
    }
}
