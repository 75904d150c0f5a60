//! Job reference parsing, for checking how a command line will be read.
//!
//! ```bash
//! $ jr-cli parse '"folder with space/my job"' 22
//! job:   folder with space/my job
//! build: 22
//! ```

use jenkins_relay_core::{JobPath, parse_build_parameters};

/// Print the job and build the relay would take from `args`.
pub fn run(args: &[String]) {
    #[allow(clippy::print_stdout)]
    {
        println!("{}", describe(args));
    }
}

fn describe(args: &[String]) -> String {
    let (job, build, ok) = parse_build_parameters(args);
    if !ok {
        return "Could not find a single job name in the arguments.".to_string();
    }

    let job_line = match JobPath::parse(&job) {
        Ok(path) => format!("job:   {path}"),
        Err(e) => format!("job:   {job} (invalid: {e})"),
    };
    if build.is_empty() {
        job_line
    } else {
        format!("{job_line}\nbuild: {build}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_describe_quoted_with_build() {
        assert_eq!(
            describe(&words("\"folder with space/my job\" 22")),
            "job:   folder with space/my job\nbuild: 22"
        );
    }

    #[test]
    fn test_describe_plain_job() {
        assert_eq!(describe(&words("deploy")), "job:   deploy");
    }

    #[test]
    fn test_describe_ambiguous() {
        assert!(describe(&words("one two three")).starts_with("Could not"));
    }
}
