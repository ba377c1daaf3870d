use std::io::{ErrorKind, IoSlice, IoSliceMut};
use std::os::fd::AsRawFd;
use std::sync::Arc;

use bytes::BytesMut;
use nix::sys::socket::{self, LinkAddr};
use socket2::Socket;
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use steer_packet::{MacAddr, STEER_FRAME_MAX};

use crate::{steering_debug, steering_warn};

use super::inst::{Message, PacketMessage};
use super::socket::{ETH_P_STEER, link_addr};

pub async fn read_packet(sock: Arc<AsyncFd<Socket>>, tx: UnboundedSender<Message>) {
    let mut buf = [0u8; 2048];
    let mut iov = [IoSliceMut::new(&mut buf)];

    loop {
        let _ = sock
            .async_io(Interest::READABLE, |sock| {
                let msg = socket::recvmsg::<LinkAddr>(
                    sock.as_raw_fd(),
                    &mut iov,
                    None,
                    socket::MsgFlags::empty(),
                )?;

                let Some(addr) = msg.address else {
                    return Err(ErrorKind::UnexpectedEof.into());
                };

                let Some(input) = msg.iovs().next() else {
                    return Err(ErrorKind::UnexpectedEof.into());
                };

                let packet = match steer_packet::parse(input) {
                    Ok(packet) => packet,
                    Err(err) => {
                        steering_debug!("frame dropped: {} ({} bytes)", err, input.len());
                        return Ok(());
                    }
                };

                let Some(src) = addr.addr().map(MacAddr::from) else {
                    return Err(ErrorKind::UnexpectedEof.into());
                };

                let _ = tx.send(Message::Recv(packet, src));
                Ok(())
            })
            .await;
    }
}

pub async fn write_packet(
    sock: Arc<AsyncFd<Socket>>,
    mut rx: UnboundedReceiver<PacketMessage>,
    ifindex: u32,
) {
    loop {
        let Some(PacketMessage::Send(packet, dst)) = rx.recv().await else {
            break;
        };

        let mut buf = BytesMut::new();
        packet.emit(&mut buf);

        if buf.len() > STEER_FRAME_MAX {
            steering_warn!("oversize frame dropped: {} bytes to {}", buf.len(), dst);
            continue;
        }

        let iov = [IoSlice::new(&buf)];
        let sockaddr = link_addr(ETH_P_STEER, ifindex, Some(dst.octets()));

        let _ = sock
            .async_io(Interest::WRITABLE, |sock| {
                socket::sendmsg(
                    sock.as_raw_fd(),
                    &iov,
                    &[],
                    socket::MsgFlags::empty(),
                    Some(&sockaddr),
                )
                .map_err(|e| std::io::Error::from_raw_os_error(e as i32))
            })
            .await;
    }
}
