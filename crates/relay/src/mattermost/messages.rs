//! Message and dialog builders for the `/jenkins` command.

use jenkins_relay_core::{JobPath, ParameterDefinition, ParameterKind};

use super::types::{
    Dialog, DialogElement, DialogElementKind, DialogOption, OpenDialogRequest, SlackAttachment,
};

/// Side bar colour of attachments posted by the relay.
pub const ATTACHMENT_COLOR: &str = "#7FC1EE";

/// Display name of bot posts.
pub const BOT_USERNAME: &str = "Jenkins Plugin";

/// Dialog callback ID for parameterized builds.
pub const BUILD_DIALOG_CALLBACK: &str = "jenkins_build";

/// Dialog callback ID for job creation.
pub const CREATE_JOB_DIALOG_CALLBACK: &str = "jenkins_createjob";

/// Dialog field holding the new job's name.
pub const JOB_NAME_FIELD: &str = "job_name";

/// Dialog field holding the new job's `config.xml`.
pub const CONFIG_FIELD: &str = "config";

/// Mattermost's limit for textarea elements.
const TEXTAREA_MAX_LENGTH: u32 = 3000;

const HELP_TEXT: &str = "###### Mattermost Jenkins Plugin - Slash Command Help
* `/jenkins connect <username> <API Token>` - Connect your Mattermost account to Jenkins
* `/jenkins build <jobname>` - Trigger a build for the given job
  * If the job is inside a folder, use `/jenkins build <foldername/jobname>`
  * Wrap names containing spaces in double quotes: `/jenkins build \"my folder/my job\"`
* `/jenkins get-artifacts <jobname> [build number]` - Upload the artifacts of a build (default: last build)
* `/jenkins test-results <jobname> [build number]` - Link to the test report of a build
* `/jenkins get-log <jobname> [build number]` - Upload the console log of a build
* `/jenkins abort <jobname> <build number>` - Abort a running build
* `/jenkins disable <jobname>` - Disable a job
* `/jenkins enable <jobname>` - Enable a job
* `/jenkins delete <jobname>` - Delete a job
* `/jenkins createjob [jobname]` - Create a job from a config.xml document
* `/jenkins plugins` - List the plugins installed on the Jenkins server
* `/jenkins safe-restart` - Restart Jenkins once running builds finish
* `/jenkins me` - Show the connected Jenkins account
* `/jenkins disconnect` - Disconnect your Mattermost account from Jenkins
* `/jenkins help` - Show this help text";

/// Help text listing every `/jenkins` action.
#[must_use]
pub const fn help_text() -> &'static str {
    HELP_TEXT
}

/// Wrap `text` in the relay's standard attachment.
#[must_use]
pub fn attachment(text: impl Into<String>) -> SlackAttachment {
    let text = text.into();
    SlackAttachment {
        fallback: Some(text.clone()),
        text,
        color: ATTACHMENT_COLOR.to_string(),
    }
}

/// Dialog element for one declared build parameter.
#[must_use]
pub fn parameter_element(definition: &ParameterDefinition) -> DialogElement {
    let mut element = DialogElement::text(definition.name.clone(), definition.name.clone());
    element.help_text.clone_from(&definition.description);
    element.default.clone_from(&definition.default_value);
    element.optional = definition.kind != ParameterKind::Other;

    match definition.kind {
        ParameterKind::Boolean => {
            element.kind = DialogElementKind::Bool;
            element.default = Some(
                definition
                    .default_value
                    .clone()
                    .unwrap_or_else(|| "false".to_string()),
            );
        }
        ParameterKind::Choice => {
            element.kind = DialogElementKind::Select;
            element.options = definition
                .choices
                .iter()
                .map(|choice| DialogOption {
                    text: choice.clone(),
                    value: choice.clone(),
                })
                .collect();
        }
        ParameterKind::Text => {
            element.kind = DialogElementKind::Textarea;
            element.max_length = Some(TEXTAREA_MAX_LENGTH);
        }
        ParameterKind::Password => element.subtype = Some("password".to_string()),
        ParameterKind::String | ParameterKind::Other => {}
    }

    element
}

/// Dialog asking for the parameters of a build of `job`.
#[must_use]
pub fn build_parameters_dialog(
    trigger_id: &str,
    callback_url: String,
    job: &JobPath,
    definitions: &[ParameterDefinition],
) -> OpenDialogRequest {
    OpenDialogRequest {
        trigger_id: trigger_id.to_string(),
        url: callback_url,
        dialog: Dialog {
            callback_id: BUILD_DIALOG_CALLBACK.to_string(),
            title: "Build parameters".to_string(),
            introduction_text: format!("Parameters for a build of **{job}**"),
            elements: definitions.iter().map(parameter_element).collect(),
            submit_label: "Build".to_string(),
            notify_on_cancel: false,
            state: job.to_string(),
        },
    }
}

/// Dialog asking for a new job's `config.xml` (and its name, when the
/// command didn't give one).
#[must_use]
pub fn create_job_dialog(
    trigger_id: &str,
    callback_url: String,
    job: Option<&JobPath>,
) -> OpenDialogRequest {
    let mut elements = Vec::new();
    if job.is_none() {
        let mut name = DialogElement::text(JOB_NAME_FIELD, "Job name");
        name.placeholder = Some("folder/jobname".to_string());
        elements.push(name);
    }

    let mut config = DialogElement::text(CONFIG_FIELD, "Job configuration");
    config.kind = DialogElementKind::Textarea;
    config.max_length = Some(TEXTAREA_MAX_LENGTH);
    config.help_text = Some("Contents of the job's config.xml".to_string());
    elements.push(config);

    OpenDialogRequest {
        trigger_id: trigger_id.to_string(),
        url: callback_url,
        dialog: Dialog {
            callback_id: CREATE_JOB_DIALOG_CALLBACK.to_string(),
            title: "Create Jenkins job".to_string(),
            introduction_text: job
                .map(|job| format!("Creating **{job}**"))
                .unwrap_or_default(),
            elements,
            submit_label: "Create".to_string(),
            notify_on_cancel: false,
            state: job.map(ToString::to_string).unwrap_or_default(),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn definition(name: &str, kind: ParameterKind) -> ParameterDefinition {
        ParameterDefinition {
            name: name.to_string(),
            kind,
            default_value: None,
            description: Some(format!("{name} help")),
            choices: Vec::new(),
        }
    }

    #[test]
    fn test_help_lists_every_action() {
        for action in [
            "connect",
            "build",
            "get-artifacts",
            "test-results",
            "get-log",
            "abort",
            "disable",
            "enable",
            "delete",
            "createjob",
            "plugins",
            "safe-restart",
            "me",
            "disconnect",
        ] {
            assert!(help_text().contains(&format!("/jenkins {action}")), "{action}");
        }
    }

    #[test]
    fn test_attachment_color() {
        let attachment = attachment("hello");
        assert_eq!(attachment.color, "#7FC1EE");
        assert_eq!(attachment.fallback.as_deref(), Some("hello"));
    }

    #[test]
    fn test_parameter_elements() {
        let element = parameter_element(&definition("DRY_RUN", ParameterKind::Boolean));
        assert_eq!(element.kind, DialogElementKind::Bool);
        assert_eq!(element.default.as_deref(), Some("false"));
        assert!(element.optional);

        let mut env = definition("ENV", ParameterKind::Choice);
        env.choices = vec!["staging".to_string(), "production".to_string()];
        let element = parameter_element(&env);
        assert_eq!(element.kind, DialogElementKind::Select);
        assert_eq!(element.options.len(), 2);

        let element = parameter_element(&definition("SECRET", ParameterKind::Password));
        assert_eq!(element.subtype.as_deref(), Some("password"));

        let element = parameter_element(&definition("FILE", ParameterKind::Other));
        assert!(!element.optional);
        assert_eq!(element.help_text.as_deref(), Some("FILE help"));
    }

    #[test]
    fn test_build_parameters_dialog() {
        let job = JobPath::parse("folder/deploy").unwrap();
        let request = build_parameters_dialog(
            "trigger-1",
            "http://relay.test/api/triggerBuild/folder%2Fdeploy".to_string(),
            &job,
            &[definition("BRANCH", ParameterKind::String)],
        );
        assert_eq!(request.trigger_id, "trigger-1");
        assert_eq!(request.dialog.state, "folder/deploy");
        assert_eq!(request.dialog.elements.len(), 1);
    }

    #[test]
    fn test_create_job_dialog_asks_for_missing_name() {
        let request = create_job_dialog("t", "http://relay.test/api/createJob".to_string(), None);
        let names: Vec<_> = request.dialog.elements.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec![JOB_NAME_FIELD, CONFIG_FIELD]);

        let job = JobPath::parse("new-job").unwrap();
        let request = create_job_dialog("t", "http://relay.test/api/createJob/new-job".to_string(), Some(&job));
        assert_eq!(request.dialog.elements.len(), 1);
        assert_eq!(request.dialog.elements[0].kind, DialogElementKind::Textarea);
    }
}
