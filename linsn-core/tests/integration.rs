//! Integration tests for the full output lifecycle over the in-memory
//! transport: init, discovery, streaming ticks, failure recovery and
//! shutdown.

use linsn_core::{
    FrameLog, GammaCurve, HEADER_LEN, LinsnError, LinsnOutput, MacAddr, MemoryRegistry,
    MemoryTransport, OutputConfig, OutputPlan, PAYLOAD_LEN, Transport,
};

// ── Helpers ──────────────────────────────────────────────────────

const HOST_MAC: MacAddr = MacAddr([0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee]);

fn config(panels: usize) -> OutputConfig {
    let mut c = OutputConfig::single_chain(panels);
    c.discovery.interval_ms = 0;
    c
}

/// Initialise an output on a fresh memory transport and hand back the
/// frame log with the discovery frames already drained.
fn streaming_output(
    start_channel: usize,
    config: &OutputConfig,
) -> (LinsnOutput<MemoryTransport>, FrameLog) {
    let out = LinsnOutput::init(start_channel, config, |_| {
        Ok(MemoryTransport::new().with_hardware_addr(HOST_MAC))
    })
    .unwrap();
    let log = out.transport().log();
    log.drain();
    (out, log)
}

fn sequence(frame: &[u8]) -> u16 {
    u16::from_le_bytes([frame[14], frame[15]])
}

// ── Sizing ───────────────────────────────────────────────────────

#[test]
fn test_frame_buffer_size_without_io() {
    let plan = OutputPlan::new(0, &OutputConfig::single_chain(1)).unwrap();
    assert_eq!(plan.frame_buffer_len(), 512 * 256 * 3 + 96);
    assert_eq!(plan.format().code, 0xd2);
}

#[test]
fn test_large_canvas_selects_second_format() {
    // 20 panels of 32x16 side by side: 640 pixels wide.
    let plan = OutputPlan::new(0, &OutputConfig::single_chain(20)).unwrap();
    assert_eq!(plan.format().code, 0xc2);
    assert_eq!(plan.frame_buffer_len(), 1024 * 512 * 3 + 1632);
    assert_eq!(plan.frame_packets(), (16 * 1024 + 1632) / 480 + 1);
}

// ── Lifecycle ────────────────────────────────────────────────────

#[test]
fn test_discovery_then_streaming() {
    let out = LinsnOutput::init(0, &config(1), |_| {
        Ok(MemoryTransport::new().with_hardware_addr(HOST_MAC))
    })
    .unwrap();
    assert!(out.phase().is_streaming());

    let frames = out.transport().log().frames();
    assert_eq!(frames.len(), 2);
    assert!(frames.iter().all(|f| f[0..6] == [0xff; 6]));
    assert_eq!(&frames[0][6..12], &HOST_MAC.octets());
    assert_eq!(&frames[1][47..49], &[0xfe, 0xff]);
}

#[test]
fn test_full_tick_frames() {
    let (mut out, log) = streaming_output(0, &config(1));
    let mut channels = vec![0x40u8; out.channel_count()];

    assert_eq!(out.send_data(&mut channels).unwrap(), 1536);

    let frames = log.drain();
    assert_eq!(frames.len(), out.frame_packets());
    assert_eq!(frames.len(), 18);
    for (i, f) in frames.iter().enumerate() {
        assert_eq!(sequence(f) as usize, i);
        assert_eq!(&f[0..6], &MacAddr::RECEIVER.octets());
        assert_eq!(&f[6..12], &HOST_MAC.octets());
        assert_eq!(&f[12..14], &[0xaa, 0x55]);
    }

    let lead = &frames[0];
    assert_eq!(lead[22], 0x96);
    assert_eq!(lead[26], 0x85);
    assert_eq!(lead[27], 0x0f);
    assert_eq!(&lead[28..32], &[0xff; 4]);
    assert_eq!(lead[45], 0xd2);
}

#[test]
fn test_payload_carries_remapped_pixels() {
    let (mut out, log) = streaming_output(0, &config(1));
    let mut channels: Vec<u8> = (0..out.channel_count()).map(|i| (i % 256) as u8).collect();
    out.send_data(&mut channels).unwrap();

    let frames = log.drain();
    // First pixel of the single panel sits right after the 96-byte offset.
    let first = &frames[1][HEADER_LEN + 96..HEADER_LEN + 99];
    assert_eq!(first, &[0, 1, 2]);

    // Row 1 starts one full 512-pixel hardware row later.
    let row1 = 96 + 512 * 3;
    let frame = 1 + row1 / PAYLOAD_LEN;
    let at = HEADER_LEN + row1 % PAYLOAD_LEN;
    assert_eq!(frames[frame][at], 32 * 3);
}

#[test]
fn test_gamma_is_applied() {
    let mut c = config(1);
    c.gamma = linsn_core::GammaSetting::Number(2.2);
    let (mut out, log) = streaming_output(0, &c);
    let mut channels = vec![128u8; out.channel_count()];
    out.send_data(&mut channels).unwrap();

    let expected = GammaCurve::new(2.2).apply(128);
    let frames = log.drain();
    assert_eq!(frames[1][HEADER_LEN + 96], expected);
    assert!(expected < 128);
}

#[test]
fn test_start_channel_offsets_the_read() {
    let (mut out, log) = streaming_output(3, &config(1));
    let mut channels = vec![0u8; 3 + out.channel_count()];
    channels[0..3].copy_from_slice(&[9, 9, 9]);
    channels[3..6].copy_from_slice(&[1, 2, 3]);
    out.send_data(&mut channels).unwrap();

    let frames = log.drain();
    assert_eq!(&frames[1][HEADER_LEN + 96..HEADER_LEN + 99], &[1, 2, 3]);
}

// ── Failure and recovery ─────────────────────────────────────────

#[test]
fn test_mid_stream_failure_recovers_next_tick() {
    let (mut out, log) = streaming_output(0, &config(1));
    let mut channels = vec![0u8; out.channel_count()];

    // Two discovery frames were already attempted; fail payload frame 4.
    out.transport_mut().fail_attempt(2 + 4);
    assert_eq!(out.send_data(&mut channels).unwrap(), 0);
    assert_eq!(log.drain().len(), 4);
    assert!(out.phase().is_streaming());

    assert_eq!(out.send_data(&mut channels).unwrap(), 1536);
    let frames = log.drain();
    assert_eq!(frames.len(), 18);
    assert_eq!(sequence(&frames[0]), 0);
}

#[test]
fn test_lead_frame_failure_recovers_next_tick() {
    let (mut out, log) = streaming_output(0, &config(1));
    let mut channels = vec![0u8; out.channel_count()];

    // The first attempt after discovery is the lead frame.
    out.transport_mut().fail_attempt(2);
    assert_eq!(out.send_data(&mut channels).unwrap(), 0);
    assert!(log.is_empty());
    assert!(out.phase().is_streaming());

    assert_eq!(out.send_data(&mut channels).unwrap(), 1536);
    let frames = log.drain();
    assert_eq!(frames.len(), 18);
    assert_eq!(sequence(&frames[0]), 0);
    assert_eq!(frames[0][45], 0xd2);
}

// ── Lenient configuration ────────────────────────────────────────

#[test]
fn test_host_object_with_loose_values_streams() {
    let mut json = serde_json::json!({
        "panelWidth": 0,
        "panelHeight": 0,
        "gamma": null,
        "colorOrder": "nonsense",
        "discovery": {"intervalMs": 0},
        "panels": [],
    });
    // 17 panels on one output, wrapped into a 5-column grid.
    json["panels"] = (0..17)
        .map(|i| {
            serde_json::json!({
                "outputNumber": 0,
                "panelNumber": i,
                "orientation": "N",
                "xOffset": (i % 5) * 32,
                "yOffset": (i / 5) * 16,
            })
        })
        .collect();
    let c = OutputConfig::from_value(json).unwrap();

    let (mut out, log) = streaming_output(0, &c);
    assert_eq!(out.format().code, 0xc2);
    let mut channels = vec![0u8; out.channel_count()];
    assert_eq!(out.send_data(&mut channels).unwrap(), 160 * 64 * 3);
    assert_eq!(log.drain().len(), out.frame_packets());
}

#[test]
fn test_discovery_failure_is_not_fatal() {
    let out = LinsnOutput::init(0, &config(1), |_| {
        let mut t = MemoryTransport::new().with_hardware_addr(HOST_MAC);
        t.fail_attempt(0);
        t.fail_attempt(1);
        Ok(t)
    })
    .unwrap();
    assert!(out.phase().is_streaming());
    assert_eq!(out.discovery_report().failed, 2);
}

#[test]
fn test_close_rejects_further_sends() {
    let (mut out, log) = streaming_output(0, &config(1));
    out.close();
    assert!(!out.transport().is_open());

    let mut channels = vec![0u8; out.channel_count()];
    assert!(matches!(
        out.send_data(&mut channels),
        Err(LinsnError::InvalidState(_))
    ));
    assert!(log.is_empty());
}

// ── Collaborators ────────────────────────────────────────────────

#[test]
fn test_sub_matrix_overlay_reaches_the_wire() {
    let mut c = config(1);
    // A 1x1 sub-matrix stored just past the canvas, drawn at (0, 0).
    c.sub_matrices.push(linsn_core::SubMatrixConfig {
        enabled: true,
        start_channel: 1536 + 1,
        width: 1,
        height: 1,
        x_offset: 0,
        y_offset: 0,
    });
    let (mut out, log) = streaming_output(0, &c);
    let mut channels = vec![0u8; 1536 + 3];
    channels[1536..].copy_from_slice(&[7, 8, 9]);
    out.send_data(&mut channels).unwrap();

    let frames = log.drain();
    assert_eq!(&frames[1][HEADER_LEN + 96..HEADER_LEN + 99], &[7, 8, 9]);
}

#[test]
fn test_preview_registration() {
    let (out, _log) = streaming_output(0, &config(2));
    let mut registry = MemoryRegistry::new();
    let name = out.register_preview(&mut registry).unwrap();
    assert_eq!(name, "LED Panels");
    let model = registry.get(&name).unwrap();
    assert_eq!(model.channel_count, 64 * 16 * 3);
    assert_eq!(out.required_channel_ranges(), vec![(0, 64 * 16 * 3 - 1)]);
}
