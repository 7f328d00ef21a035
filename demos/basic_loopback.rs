//! Basic loopback example

use prbslink_core::{LinkEndpoint, LinkId, LinkMonitor, MonitorConfig, QueueTransport, RxSink};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Prbslink Basic Loopback Example\n");

    let config = MonitorConfig {
        payload_len: 256,
        ..Default::default()
    };

    for link in [LinkId::ethernet(0), LinkId::point_to_point(0)] {
        let mut endpoint = LinkEndpoint::new(LinkMonitor::new(link, &config)?);
        let mut wire = QueueTransport::new();

        let sent = endpoint.pump_tx(&mut wire, 1000);
        for frame in wire.drain() {
            endpoint.deliver(frame);
        }

        let view = endpoint.monitor().snapshot();
        println!("Link {} ({:?} delivery)", link, endpoint.mode());
        println!("  sent:     {}", sent);
        println!("  received: {}", view.counters.frames_received);
        println!("  ok:       {}", view.counters.frames_ok);
        println!("  BER:      {:.3e}", view.bit_error_rate);
        println!("  state:    {}\n", view.tracker.name());
    }

    Ok(())
}
