use std::os::fd::AsRawFd;

use nix::sys::socket::{self, LinkAddr, SockaddrLike};
use socket2::{Domain, Protocol, Socket, Type};

/// Ethertype of steering frames. Chosen experimentally; unassigned.
pub const ETH_P_STEER: u16 = 0x8267;

/// AF_PACKET datagram socket bound to the steering ethertype on one
/// interface. The kernel delivers only matching frames, so no filter is
/// needed.
pub fn steering_socket(ifindex: u32) -> Result<Socket, std::io::Error> {
    let socket = Socket::new(
        Domain::PACKET,
        Type::DGRAM,
        Some(Protocol::from(ETH_P_STEER.to_be() as i32)),
    )?;

    socket.set_nonblocking(true)?;

    let sockaddr = link_addr(ETH_P_STEER, ifindex, None);

    socket::bind(socket.as_raw_fd(), &sockaddr)?;

    Ok(socket)
}

pub fn link_addr(protocol: u16, ifindex: u32, addr: Option<[u8; 6]>) -> LinkAddr {
    let mut sll = libc::sockaddr_ll {
        sll_family: libc::AF_PACKET as u16,
        sll_protocol: protocol.to_be(),
        sll_ifindex: ifindex as i32,
        sll_halen: 0,
        sll_hatype: 0,
        sll_pkttype: 0,
        sll_addr: [0; 8],
    };
    if let Some(addr) = addr {
        sll.sll_halen = 6;
        sll.sll_addr[..6].copy_from_slice(&addr);
    }
    let sll_len = std::mem::size_of_val(&sll) as libc::socklen_t;
    unsafe { LinkAddr::from_raw(&sll as *const _ as *const _, Some(sll_len)) }.unwrap()
}
