/// Keys build.rs must find in `.env`
const REQUIRED_ENV: [&str; 2] = ["WIFI_SSID", "WIFI_PASSWORD"];

/// Collector settings fall back to the bench defaults
const DEFAULT_ENV: [(&str, &str); 4] = [
    ("API_IP", "192.168.1.100"),
    ("API_PORT", "8080"),
    ("API_USERNAME", "admin"),
    ("API_PASSWORD", "password"),
];

fn main() {
    load_dotenv();

    linker_be_nice();
    // make sure linkall.x is the last linker script (otherwise might cause problems with flip-link)
    println!("cargo:rustc-link-arg=-Tlinkall.x");
}

fn load_dotenv() {
    println!("cargo:rerun-if-changed=.env");

    let env_path = std::path::Path::new(".env");
    let contents = match std::fs::read_to_string(env_path) {
        Ok(contents) => contents,
        Err(_) => panic!(
            "\n\n\
            Missing .env file!\n\
            \n\
            Please create a .env file with your WiFi credentials and collector address:\n\
            \n\
            cp .env.example .env\n\
            \n"
        ),
    };

    let mut found = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            println!("cargo:rustc-env={}={}", key, value.trim());
            found.push(key.to_owned());
        }
    }

    for key in REQUIRED_ENV {
        if !found.iter().any(|k| k == key) {
            panic!("\n\n.env is missing {}\n", key);
        }
    }
    for (key, default) in DEFAULT_ENV {
        if !found.iter().any(|k| k == key) {
            println!("cargo:rustc-env={}={}", key, default);
        }
    }
}

fn linker_be_nice() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 2 {
        let kind = &args[1];
        let what = &args[2];

        match kind.as_str() {
            "undefined-symbol" => match what.as_str() {
                "_stack_start" => {
                    eprintln!();
                    eprintln!("💡 Is the linker script `linkall.x` missing?");
                    eprintln!();
                }
                "esp_wifi_preempt_enable"
                | "esp_wifi_preempt_yield_task"
                | "esp_wifi_preempt_task_create" => {
                    eprintln!();
                    eprintln!(
                        "💡 `esp-wifi` has no scheduler enabled. Make sure you have the `builtin-scheduler` feature enabled, or that you provide an external scheduler."
                    );
                    eprintln!();
                }
                _ => (),
            },
            // we don't have anything helpful for "missing-lib" yet
            _ => {
                std::process::exit(1);
            }
        }

        std::process::exit(0);
    }

    println!(
        "cargo:rustc-link-arg=-Wl,--error-handling-script={}",
        std::env::current_exe().unwrap().display()
    );
}
