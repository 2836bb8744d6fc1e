// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! AMQP 0-9-1 connector (RabbitMQ) built on `lapin`.
//!
//! Every connect declares the exchange, a durable queue and the binding, then
//! switches the channel to publisher-confirm mode so `send` only returns once
//! the broker has taken responsibility for the message.

use async_trait::async_trait;
use lapin::options::{
    BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions, QueueBindOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use super::{BrokerConnector, BrokerLink, PublishError};
use crate::domain::node_config::{BrokerConfig, ExchangeType};

const CONTENT_TYPE_JSON: &str = "application/json";

impl From<lapin::Error> for PublishError {
    fn from(err: lapin::Error) -> Self {
        PublishError::Broker(err.to_string())
    }
}

impl From<ExchangeType> for ExchangeKind {
    fn from(kind: ExchangeType) -> Self {
        match kind {
            ExchangeType::Direct => ExchangeKind::Direct,
            ExchangeType::Fanout => ExchangeKind::Fanout,
            ExchangeType::Topic => ExchangeKind::Topic,
            ExchangeType::Headers => ExchangeKind::Headers,
        }
    }
}

/// Broker topology shared by every connection
#[derive(Debug, Clone)]
pub struct AmqpTopology {
    pub exchange_name: String,
    pub exchange_type: ExchangeType,
    pub queue_name: String,
    pub binding_key: String,
}

impl From<&BrokerConfig> for AmqpTopology {
    fn from(config: &BrokerConfig) -> Self {
        Self {
            exchange_name: config.exchange_name.clone(),
            exchange_type: config.exchange_type,
            queue_name: config.queue_name.clone(),
            binding_key: config.binding_key.clone(),
        }
    }
}

pub struct AmqpConnector {
    uri: String,
    topology: AmqpTopology,
}

impl AmqpConnector {
    pub fn new(uri: impl Into<String>, topology: AmqpTopology) -> Self {
        Self {
            uri: uri.into(),
            topology,
        }
    }

    pub fn from_config(config: &BrokerConfig) -> anyhow::Result<Self> {
        Ok(Self::new(config.resolved_uri()?, AmqpTopology::from(config)))
    }

    async fn declare_topology(&self, channel: &Channel) -> Result<(), lapin::Error> {
        let topology = &self.topology;

        channel
            .exchange_declare(
                &topology.exchange_name,
                topology.exchange_type.into(),
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;

        channel
            .queue_declare(
                &topology.queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;

        channel
            .queue_bind(
                &topology.queue_name,
                &topology.exchange_name,
                &topology.binding_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;

        debug!(
            exchange = %topology.exchange_name,
            exchange_type = topology.exchange_type.as_str(),
            queue = %topology.queue_name,
            binding_key = %topology.binding_key,
            "Declared broker topology"
        );
        Ok(())
    }
}

#[async_trait]
impl BrokerConnector for AmqpConnector {
    async fn connect(&self, lost: Arc<Notify>) -> Result<Arc<dyn BrokerLink>, PublishError> {
        let connection = Connection::connect(&self.uri, ConnectionProperties::default()).await?;

        connection.on_error(move |err| {
            error!("AMQP connection error: {}", err);
            lost.notify_one();
        });

        let channel = connection.create_channel().await?;
        if let Err(e) = self.declare_topology(&channel).await {
            if let Err(close_err) = connection.close(200, "topology declaration failed").await {
                debug!("Failed to close half-open AMQP connection: {}", close_err);
            }
            return Err(e.into());
        }

        info!(exchange = %self.topology.exchange_name, "AMQP channel ready");

        Ok(Arc::new(AmqpLink {
            connection,
            channel,
            exchange: self.topology.exchange_name.clone(),
            routing_key: self.topology.binding_key.clone(),
        }))
    }
}

pub struct AmqpLink {
    connection: Connection,
    channel: Channel,
    exchange: String,
    routing_key: String,
}

#[async_trait]
impl BrokerLink for AmqpLink {
    async fn send(&self, payload: &[u8]) -> Result<(), PublishError> {
        let confirm = self
            .channel
            .basic_publish(
                &self.exchange,
                &self.routing_key,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_content_type(CONTENT_TYPE_JSON.into()),
            )
            .await?
            .await?;

        if confirm.is_nack() {
            return Err(PublishError::Nacked);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }

    async fn close(&self) {
        if !self.connection.status().connected() {
            return;
        }
        if let Err(e) = self.connection.close(200, "publisher closed").await {
            warn!("Error closing AMQP connection: {}", e);
        }
    }
}
