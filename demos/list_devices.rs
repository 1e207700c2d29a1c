//! Lists Raw Input devices and their HID capabilities.
//!
//! `RUST_LOG=rawtap=debug cargo run --example list_devices`

#[cfg(windows)]
fn main() {
    use rawtap::{DeviceClass, RawInputConfig, RawInputManager};
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut mgr = RawInputManager::win32(RawInputConfig::default());
    let devices = mgr.discover().expect("discover devices").to_vec();
    println!("Discovered {} device(s)", devices.len());

    for d in &devices {
        println!("- {} [{}] {}", d.name, d.class, d.identity);
        println!("    path={}", d.path);
        if let Some(class) = &d.class_name {
            println!("    setup class={class}");
        }
        if d.class == DeviceClass::OtherHid {
            match mgr.capabilities(d.handle) {
                Ok(caps) => {
                    println!(
                        "    up=0x{:02x} u=0x{:02x} buttons={} axes={}",
                        caps.caps.usage_page,
                        caps.caps.usage,
                        caps.button_count,
                        caps.axes.len()
                    );
                    for (i, a) in caps.axes.iter().enumerate() {
                        println!("      A{i} logical=[{}..{}]", a.minimum, a.maximum);
                    }
                }
                Err(e) => println!("    capabilities unavailable: {e}"),
            }
        }
    }

    println!("{}", mgr.report_json().expect("device report"));
}

#[cfg(not(windows))]
fn main() {
    eprintln!("Raw Input is only available on Windows");
}
