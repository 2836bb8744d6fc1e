// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Client commands against a running rotation daemon
//!
//! Commands: add, remove, click, pick

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use tonic::transport::Channel;

use rotation_core::presentation::grpc::rotation_v1::banner_rotation_client::BannerRotationClient;
use rotation_core::presentation::grpc::rotation_v1::{
    AddBannerRequest, ClickBannerRequest, PickBannerRequest, RemoveBannerRequest,
};

#[derive(Subcommand)]
pub enum BannerCommand {
    /// Assign a banner to a slot
    Add {
        #[arg(long)]
        banner: i64,
        #[arg(long)]
        slot: i64,
    },

    /// Remove a banner from a slot
    Remove {
        #[arg(long)]
        banner: i64,
        #[arg(long)]
        slot: i64,
    },

    /// Record a click
    Click {
        #[arg(long)]
        banner: i64,
        #[arg(long)]
        slot: i64,
        #[arg(long)]
        usergroup: i64,
    },

    /// Pick a banner to show and record the impression
    Pick {
        #[arg(long)]
        slot: i64,
        #[arg(long)]
        usergroup: i64,
    },
}

pub async fn handle_command(command: BannerCommand, endpoint: &str) -> Result<()> {
    let mut client = connect(endpoint).await?;

    let message = match command {
        BannerCommand::Add { banner, slot } => {
            client
                .add_banner(AddBannerRequest {
                    banner_id: banner,
                    slot_id: slot,
                })
                .await
                .map_err(status_error)?
                .into_inner()
                .message
        }
        BannerCommand::Remove { banner, slot } => {
            client
                .remove_banner(RemoveBannerRequest {
                    banner_id: banner,
                    slot_id: slot,
                })
                .await
                .map_err(status_error)?
                .into_inner()
                .message
        }
        BannerCommand::Click {
            banner,
            slot,
            usergroup,
        } => {
            client
                .click_banner(ClickBannerRequest {
                    banner_id: banner,
                    slot_id: slot,
                    usergroup_id: usergroup,
                })
                .await
                .map_err(status_error)?
                .into_inner()
                .message
        }
        BannerCommand::Pick { slot, usergroup } => {
            let picked = client
                .pick_banner(PickBannerRequest {
                    slot_id: slot,
                    usergroup_id: usergroup,
                })
                .await
                .map_err(status_error)?
                .into_inner();
            println!("{} {}", "Banner:".bold(), picked.banner_id);
            picked.message
        }
    };

    println!("{}", format!("✓ {}", message).green());
    Ok(())
}

async fn connect(endpoint: &str) -> Result<BannerRotationClient<Channel>> {
    BannerRotationClient::connect(endpoint.to_string())
        .await
        .with_context(|| format!("Failed to connect to rotation daemon at {}", endpoint))
}

fn status_error(status: tonic::Status) -> anyhow::Error {
    anyhow::anyhow!("{:?}: {}", status.code(), status.message())
}
