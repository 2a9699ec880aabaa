/// Entry point for the Cgroup Labels tool.
///
/// Decodes cgroup ids into cgroup paths, or process ids into docker container ids,
/// and prints one label per input value.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or any value failed to decode.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug cgroup-labels cgroup 4026531835
/// echo 1234 | PROC_ROOT=/rootfs/proc cgroup-labels docker_container_id_from_pid
/// ```
fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    cgroup_labels::run()
}
