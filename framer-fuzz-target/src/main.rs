#[macro_use]
extern crate afl;
extern crate antlink;
use antlink::drivers::{decode_message, Framer, Transport};
use antlink::events::AntEvent;
use antlink::plus::Profile;
use antlink::router::ChannelPool;
use core::time::Duration;

struct TransportMock {}

impl Transport for TransportMock {
    type Error = u8;
    fn open(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
    fn write(&mut self, _bytes: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }
    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

fn main() {
    fuzz!(|data: &[u8]| {
        let mut framer = Framer::new();
        for chunk in data.chunks(7) {
            for frame in framer.push(chunk) {
                let _ = decode_message(&frame);
            }
        }

        let events: Vec<AntEvent> = Vec::new();
        if let Ok(mut pool) = ChannelPool::new(TransportMock {}, events) {
            if let Ok(n) = pool.add_channel(Profile::Generic) {
                if let Some(channel) = pool.channel_mut(n) {
                    channel.search();
                }
            }
            pool.on_raw_bytes(data, Duration::ZERO);
            let _ = pool.process(Duration::from_secs(1));
        }
    });
}
