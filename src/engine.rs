//! Channel-driven engine task.
//!
//! Embeddings that run an async executor spawn [`engine_task`] and talk to
//! the peripheral over three channels: commands in, platform events in,
//! status out. The task owns the [`HidPeripheral`] outright, so no locking
//! is needed around the engine state.
//!
//! The task is generic over the channel mutex so host tests can drive it
//! with `NoopRawMutex`; on target the embedding picks the mutex matching
//! its interrupt model.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Receiver, Sender};
use heapless::{String, Vec};
use log::debug;

use crate::config::{MAX_INPUT_REPORT_LEN, MAX_PEER_NAME};
use crate::descriptor::HidProfile;
use crate::error::Error;
use crate::link::{ConnectionState, Transport};
use crate::peripheral::{HidPeripheral, HostReply, HostRequest};

pub const COMMAND_QUEUE_LEN: usize = 8;
pub const EVENT_QUEUE_LEN: usize = 8;
pub const STATUS_QUEUE_LEN: usize = 8;

/// Commands from the embedding into the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Activate(HidProfile),
    Deactivate(HidProfile),
    StartAdvertising,
    Stop,
    Input(InputCommand),
}

/// Semantic input events, one per outgoing report (or press/release pair).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputCommand {
    PointerMove { dx: i16, dy: i16 },
    PointerButtons(u8),
    Wheel(i16),
    KeyPress(u8),
    KeyRelease(u8),
    ReleaseAllKeys,
    Consumer(u16),
    RemoteButtons(u8),
}

/// Platform events forwarded into the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    CentralConnected(String<MAX_PEER_NAME>),
    CentralDisconnected,
    Host(HostRequest),
}

/// Status reported back to the embedding.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    Advertising,
    Connected(String<MAX_PEER_NAME>),
    Disconnected,
    Idle,
    Reply(Vec<u8, MAX_INPUT_REPORT_LEN>),
    Failed(Error),
}

fn status_of(result: Result<(), Error>, ok: Option<Status>) -> Option<Status> {
    match result {
        Ok(()) => ok,
        Err(e) => Some(Status::Failed(e)),
    }
}

fn apply_input<T: Transport>(
    peripheral: &mut HidPeripheral<T>,
    input: InputCommand,
) -> Result<(), Error> {
    match input {
        InputCommand::PointerMove { dx, dy } => peripheral.move_mouse_pointer(dx, dy),
        InputCommand::PointerButtons(mask) => peripheral.set_mouse_buttons(mask),
        InputCommand::Wheel(delta) => peripheral.scroll_wheel(delta),
        InputCommand::KeyPress(usage) => peripheral.press_key(usage),
        InputCommand::KeyRelease(usage) => peripheral.release_key(usage),
        InputCommand::ReleaseAllKeys => peripheral.release_all_keys(),
        InputCommand::Consumer(usage) => peripheral.send_consumer_control(usage),
        InputCommand::RemoteButtons(mask) => peripheral.set_remote_buttons(mask),
    }
}

fn apply_command<T: Transport>(
    peripheral: &mut HidPeripheral<T>,
    command: Command,
) -> Option<Status> {
    match command {
        Command::Activate(profile) => status_of(peripheral.activate_profile(profile), None),
        Command::Deactivate(profile) => status_of(peripheral.deactivate_profile(profile), None),
        Command::StartAdvertising => {
            status_of(peripheral.start_advertising(), Some(Status::Advertising))
        }
        Command::Stop => status_of(peripheral.stop(), Some(Status::Idle)),
        Command::Input(input) => status_of(apply_input(peripheral, input), None),
    }
}

fn apply_event<T: Transport>(peripheral: &mut HidPeripheral<T>, event: Event) -> Option<Status> {
    match event {
        Event::CentralConnected(name) => status_of(
            peripheral.on_central_connected(&name),
            Some(Status::Connected(name)),
        ),
        Event::CentralDisconnected => {
            if let Err(e) = peripheral.on_central_disconnected() {
                return Some(Status::Failed(e));
            }
            // The controller re-advertises on its own unless stopped.
            match peripheral.connection_state() {
                ConnectionState::Advertising => Some(Status::Advertising),
                _ => Some(Status::Disconnected),
            }
        }
        Event::Host(request) => match peripheral.handle_host_request(request) {
            Ok(HostReply::Report(bytes)) => Some(Status::Reply(bytes)),
            Ok(HostReply::Ack) => None,
            Err(e) => Some(Status::Failed(e)),
        },
    }
}

/// Run the engine until the executor drops it. Commands and events are
/// processed strictly in arrival order per channel.
pub async fn engine_task<'a, T: Transport, M: RawMutex>(
    mut peripheral: HidPeripheral<T>,
    commands: Receiver<'a, M, Command, COMMAND_QUEUE_LEN>,
    events: Receiver<'a, M, Event, EVENT_QUEUE_LEN>,
    status: Sender<'a, M, Status, STATUS_QUEUE_LEN>,
) -> ! {
    loop {
        let update = match select(commands.receive(), events.receive()).await {
            Either::First(command) => {
                debug!("engine command: {:?}", command);
                apply_command(&mut peripheral, command)
            }
            Either::Second(event) => apply_event(&mut peripheral, event),
        };
        if let Some(update) = update {
            status.send(update).await;
        }
    }
}
