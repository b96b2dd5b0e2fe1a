//! Docker registry and buildx actions
//!
//! Every docker invocation runs with DOCKER_CONFIG pointed at the run's
//! workspace, so the registry session and the buildx builder selection live
//! and die with the run.

use async_trait::async_trait;
use dockhand_core::error::StepError;
use tokio::process::Command;

use super::{
    BuildRequest, BuilderBackend, BuilderHandle, BuilderRequest, ImageBuilder, LoginRequest,
    RegistryClient,
};
use crate::context::StepContext;
use crate::process;

/// Stderr fragments that mark a failure in the push phase of a build
const PUSH_FAILURE_MARKERS: &[&str] = &[
    "failed to push",
    "push access denied",
    "unauthorized",
    "denied: requested access",
    "insufficient_scope",
    "failed to authorize",
    "error writing layer blob",
    "failed commit on ref",
    "unexpected status from put request",
    "unexpected status from post request",
];

fn docker_command(docker_bin: &str, ctx: &StepContext<'_>) -> Command {
    let mut command = Command::new(docker_bin);
    command.env("DOCKER_CONFIG", ctx.workspace.docker_config_dir());
    command
}

/// Maps a failed `buildx build` to a push or build error
pub fn classify_build_failure(diagnostic: &str) -> StepError {
    let lower = diagnostic.to_lowercase();
    if PUSH_FAILURE_MARKERS.iter().any(|marker| lower.contains(marker)) {
        StepError::Push(diagnostic.to_string())
    } else {
        StepError::Build(diagnostic.to_string())
    }
}

/// `docker login` with the token on stdin
pub struct DockerRegistryClient {
    docker_bin: String,
}

impl DockerRegistryClient {
    pub fn new(docker_bin: String) -> Self {
        Self { docker_bin }
    }
}

#[async_trait]
impl RegistryClient for DockerRegistryClient {
    async fn login(&self, ctx: &StepContext<'_>, request: &LoginRequest) -> Result<(), StepError> {
        let registry = request.registry.as_deref().unwrap_or("default registry");
        ctx.log_info(format!("Logging in to {}", registry));

        let mut command = docker_command(&self.docker_bin, ctx);
        command.arg("login");
        if let Some(host) = &request.registry {
            command.arg(host);
        }
        command
            .arg("--username")
            .arg(request.credentials.username.expose())
            .arg("--password-stdin");

        let output = process::run(
            ctx,
            &mut command,
            Some(request.credentials.token.expose()),
        )
        .await
        .map_err(|e| {
            StepError::Authentication(format!("failed to run {}: {}", self.docker_bin, e))
        })?;

        if !output.success() {
            return Err(StepError::Authentication(ctx.redact(&output.diagnostic())));
        }

        ctx.log_info(format!("Logged in to {}", registry));
        Ok(())
    }
}

/// Provisions a dedicated buildx builder for the run
pub struct BuildxBackend {
    docker_bin: String,
}

impl BuildxBackend {
    pub fn new(docker_bin: String) -> Self {
        Self { docker_bin }
    }

    pub fn create_args(request: &BuilderRequest) -> Vec<String> {
        let mut args = vec![
            "buildx".to_string(),
            "create".to_string(),
            "--name".to_string(),
            request.name.clone(),
            "--driver".to_string(),
            request.driver.clone(),
        ];
        if !request.platforms.is_empty() {
            args.push("--platform".to_string());
            args.push(request.platforms.join(","));
        }
        args.push("--use".to_string());
        args
    }
}

#[async_trait]
impl BuilderBackend for BuildxBackend {
    async fn provision(
        &self,
        ctx: &StepContext<'_>,
        request: &BuilderRequest,
    ) -> Result<BuilderHandle, StepError> {
        ctx.log_info(format!(
            "Creating builder {} (driver {})",
            request.name, request.driver
        ));

        let spawn_error =
            |e: std::io::Error| StepError::Environment(format!("failed to run {}: {}", self.docker_bin, e));

        let mut create = docker_command(&self.docker_bin, ctx);
        create.args(Self::create_args(request));
        let output = process::run(ctx, &mut create, None)
            .await
            .map_err(spawn_error)?;
        if !output.success() {
            return Err(StepError::Environment(format!(
                "builder creation failed: {}",
                ctx.redact(&output.diagnostic())
            )));
        }

        let handle = BuilderHandle {
            name: request.name.clone(),
        };

        let mut bootstrap = docker_command(&self.docker_bin, ctx);
        bootstrap
            .args(["buildx", "inspect", "--bootstrap"])
            .arg(&request.name);
        let bootstrapped = match process::run(ctx, &mut bootstrap, None).await {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => Err(StepError::Environment(format!(
                "builder bootstrap failed: {}",
                ctx.redact(&output.diagnostic())
            ))),
            Err(e) => Err(spawn_error(e)),
        };

        // The builder exists from here on; never leave it behind
        if let Err(err) = bootstrapped {
            if let Err(e) = self.teardown(ctx, &handle).await {
                ctx.log_warning(format!("Failed to remove builder {}: {:#}", handle.name, e));
            }
            return Err(err);
        }

        ctx.log_info(format!("Builder {} is ready", handle.name));
        Ok(handle)
    }

    async fn teardown(&self, ctx: &StepContext<'_>, handle: &BuilderHandle) -> anyhow::Result<()> {
        let mut command = docker_command(&self.docker_bin, ctx);
        command.args(["buildx", "rm"]).arg(&handle.name);

        let output = process::run(ctx, &mut command, None).await?;
        if !output.success() {
            anyhow::bail!("buildx rm {} failed: {}", handle.name, output.diagnostic());
        }

        ctx.log_debug(format!("Removed builder {}", handle.name));
        Ok(())
    }
}

/// `docker buildx build`, pushing to the registry when requested
pub struct BuildxImageBuilder {
    docker_bin: String,
}

impl BuildxImageBuilder {
    pub fn new(docker_bin: String) -> Self {
        Self { docker_bin }
    }

    pub fn build_args(request: &BuildRequest) -> Vec<String> {
        let mut args = vec![
            "buildx".to_string(),
            "build".to_string(),
            "--file".to_string(),
            request.descriptor.to_string_lossy().into_owned(),
            "--tag".to_string(),
            request.tag.to_string(),
        ];
        if let Some(builder) = &request.builder {
            args.push("--builder".to_string());
            args.push(builder.clone());
        }
        if !request.platforms.is_empty() {
            args.push("--platform".to_string());
            args.push(request.platforms.join(","));
        }
        if request.push {
            args.push("--push".to_string());
        }
        args.push(request.context.to_string_lossy().into_owned());
        args
    }
}

#[async_trait]
impl ImageBuilder for BuildxImageBuilder {
    async fn build(&self, ctx: &StepContext<'_>, request: &BuildRequest) -> Result<(), StepError> {
        ctx.log_info(format!(
            "Building {} from {}",
            request.tag,
            request.descriptor.display()
        ));

        let mut command = docker_command(&self.docker_bin, ctx);
        command.args(Self::build_args(request));

        let output = process::run(ctx, &mut command, None)
            .await
            .map_err(|e| StepError::Build(format!("failed to run {}: {}", self.docker_bin, e)))?;

        if !output.success() {
            return Err(classify_build_failure(&ctx.redact(&output.diagnostic())));
        }

        if request.push {
            ctx.log_info(format!("Pushed {}", request.tag));
        } else {
            ctx.log_info(format!("Built {} (not pushed)", request.tag));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use dockhand_core::domain::image::ImageTag;
    use dockhand_core::domain::log::LogLevel;
    use dockhand_core::domain::secret::{Credentials, Secret};
    use dockhand_core::error::FailureKind;
    use std::path::PathBuf;

    fn credentials() -> Credentials {
        Credentials {
            username: Secret::new("deploy-bot"),
            token: Secret::new("s3cr3t-token"),
        }
    }

    fn builder_request() -> BuilderRequest {
        BuilderRequest {
            name: "dockhand-b1".to_string(),
            driver: "docker-container".to_string(),
            platforms: vec![],
        }
    }

    fn build_request(push: bool) -> BuildRequest {
        BuildRequest {
            context: PathBuf::from("ctx"),
            descriptor: PathBuf::from("ctx/Dockerfile"),
            tag: ImageTag::parse("acme/app:latest").unwrap(),
            platforms: vec![],
            push,
            builder: Some("dockhand-b1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_login_sends_token_on_stdin() {
        let fx = Fixture::new();
        let docker = fx.tool(
            "docker",
            r#"read token
if [ "$token" != "s3cr3t-token" ]; then echo "wrong token" >&2; exit 1; fi
echo "$*" > "$DOCKER_CONFIG/login-args"
echo "Login Succeeded""#,
        );
        let ctx = fx.context();
        let request = LoginRequest {
            registry: Some("registry.example.com".to_string()),
            credentials: credentials(),
        };

        DockerRegistryClient::new(docker)
            .login(&ctx, &request)
            .await
            .unwrap();

        let args =
            std::fs::read_to_string(fx.workspace.docker_config_dir().join("login-args")).unwrap();
        assert_eq!(
            args.trim(),
            "login registry.example.com --username deploy-bot --password-stdin"
        );
        assert!(!args.contains("s3cr3t-token"));
    }

    #[tokio::test]
    async fn test_login_rejection_is_authentication_error() {
        let fx = Fixture::new();
        let docker = fx.tool(
            "docker",
            r#"read token
echo "bad token $token for $*" >&2
exit 1"#,
        );
        let ctx = fx.context();
        let credentials = credentials();
        ctx.mask(&credentials.username);
        ctx.mask(&credentials.token);
        let request = LoginRequest {
            registry: None,
            credentials,
        };

        let err = DockerRegistryClient::new(docker)
            .login(&ctx, &request)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Authentication);
        let message = err.to_string();
        assert!(message.starts_with("authentication failed: exit code 1: bad token ***"));
        assert!(!message.contains("s3cr3t-token"));
        assert!(!message.contains("deploy-bot"));

        let logs = fx.logs();
        assert!(!logs.is_empty());
        assert!(logs.iter().all(|entry| !entry.message.contains("s3cr3t-token")
            && !entry.message.contains("deploy-bot")));
    }

    #[tokio::test]
    async fn test_login_missing_binary() {
        let fx = Fixture::new();
        let ctx = fx.context();
        let request = LoginRequest {
            registry: None,
            credentials: credentials(),
        };

        let err = DockerRegistryClient::new(fx.base.join("no-docker").display().to_string())
            .login(&ctx, &request)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Authentication);
        assert!(err.to_string().contains("failed to run"));
    }

    #[tokio::test]
    async fn test_provision_builder() {
        let fx = Fixture::new();
        let docker = fx.tool(
            "docker",
            &format!(r#"echo "$*" >> "{}""#, fx.calls_file().display()),
        );
        let ctx = fx.context();

        let handle = BuildxBackend::new(docker)
            .provision(&ctx, &builder_request())
            .await
            .unwrap();

        assert_eq!(handle.name, "dockhand-b1");
        assert_eq!(
            fx.calls(),
            vec![
                "buildx create --name dockhand-b1 --driver docker-container --use",
                "buildx inspect --bootstrap dockhand-b1",
            ]
        );
    }

    #[tokio::test]
    async fn test_bootstrap_failure_tears_down_builder() {
        let fx = Fixture::new();
        let docker = fx.tool(
            "docker",
            &format!(
                r#"echo "$*" >> "{}"
if [ "$2" = "inspect" ]; then echo "cannot reach daemon as hunter2" >&2; exit 1; fi
exit 0"#,
                fx.calls_file().display()
            ),
        );
        let ctx = fx.context();
        ctx.mask(&Secret::new("hunter2"));

        let err = BuildxBackend::new(docker)
            .provision(&ctx, &builder_request())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Environment);
        assert_eq!(
            err.to_string(),
            "environment setup failed: builder bootstrap failed: exit code 1: cannot reach daemon as ***"
        );
        assert_eq!(fx.calls().last().map(String::as_str), Some("buildx rm dockhand-b1"));
    }

    #[tokio::test]
    async fn test_bootstrap_spawn_failure_tears_down_builder() {
        let fx = Fixture::new();
        // Removes itself once the builder is created, so the bootstrap
        // command cannot be started
        let docker = fx.tool(
            "docker",
            &format!(
                r#"echo "$*" >> "{}"
rm -f "$0""#,
                fx.calls_file().display()
            ),
        );
        let ctx = fx.context();

        let err = BuildxBackend::new(docker)
            .provision(&ctx, &builder_request())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Environment);
        assert!(err.to_string().contains("failed to run"));
        assert_eq!(fx.calls().len(), 1);

        let logs = fx.logs();
        assert!(logs.iter().any(|e| e.message.ends_with("buildx rm dockhand-b1")));
        assert!(logs.iter().any(|e| e.level == LogLevel::Warning
            && e.message.starts_with("Failed to remove builder dockhand-b1")));
    }

    #[tokio::test]
    async fn test_builder_creation_failure() {
        let fx = Fixture::new();
        let docker = fx.tool(
            "docker",
            &format!(
                r#"echo "$*" >> "{}"
echo "unknown driver" >&2
exit 1"#,
                fx.calls_file().display()
            ),
        );
        let ctx = fx.context();

        let err = BuildxBackend::new(docker)
            .provision(&ctx, &builder_request())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Environment);
        assert!(err.to_string().contains("builder creation failed"));
        // Nothing was created, so nothing is removed
        assert_eq!(fx.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_build_push_failures_are_classified() {
        let fx = Fixture::new();
        let ctx = fx.context();

        let rejected = fx.tool(
            "docker-rejected",
            r#"echo "ERROR: failed to push acme/app:latest: unexpected status: 401 Unauthorized" >&2
exit 1"#,
        );
        let err = BuildxImageBuilder::new(rejected)
            .build(&ctx, &build_request(true))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Push);

        let broken = fx.tool(
            "docker-broken",
            r#"echo "ERROR: dockerfile parse error on line 3: unknown instruction: RUNN" >&2
exit 1"#,
        );
        let err = BuildxImageBuilder::new(broken)
            .build(&ctx, &build_request(true))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Build);
        assert!(err.to_string().contains("unknown instruction: RUNN"));
    }

    #[tokio::test]
    async fn test_build_runs_buildx_in_run_config() {
        let fx = Fixture::new();
        let docker = fx.tool(
            "docker",
            &format!(
                r#"echo "$DOCKER_CONFIG $*" >> "{}""#,
                fx.calls_file().display()
            ),
        );
        let ctx = fx.context();

        BuildxImageBuilder::new(docker)
            .build(&ctx, &build_request(true))
            .await
            .unwrap();

        let expected = format!(
            "{} buildx build --file ctx/Dockerfile --tag acme/app:latest --builder dockhand-b1 --push ctx",
            fx.workspace.docker_config_dir().display()
        );
        assert_eq!(fx.calls(), vec![expected]);
    }

    #[test]
    fn test_classify_push_failure() {
        let err = classify_build_failure(
            "ERROR: failed to solve: failed to push acme/app:latest: unexpected status: 401 Unauthorized",
        );
        assert_eq!(err.kind(), FailureKind::Push);

        let err = classify_build_failure("denied: requested access to the resource is denied");
        assert_eq!(err.kind(), FailureKind::Push);
    }

    #[test]
    fn test_classify_build_failure() {
        let err = classify_build_failure(
            "ERROR: failed to solve: dockerfile parse error on line 3: unknown instruction: RUNN",
        );
        assert_eq!(err.kind(), FailureKind::Build);
    }

    #[test]
    fn test_create_args() {
        let request = BuilderRequest {
            name: "dockhand-abc".to_string(),
            driver: "docker-container".to_string(),
            platforms: vec!["linux/amd64".to_string(), "linux/arm64".to_string()],
        };
        assert_eq!(
            BuildxBackend::create_args(&request),
            vec![
                "buildx",
                "create",
                "--name",
                "dockhand-abc",
                "--driver",
                "docker-container",
                "--platform",
                "linux/amd64,linux/arm64",
                "--use"
            ]
        );
    }

    #[test]
    fn test_build_args() {
        let request = BuildRequest {
            context: PathBuf::from("/w/src/."),
            descriptor: PathBuf::from("/w/src/Dockerfile"),
            tag: ImageTag::parse("acme/contours:latest").unwrap(),
            platforms: vec![],
            push: true,
            builder: Some("dockhand-abc".to_string()),
        };
        assert_eq!(
            BuildxImageBuilder::build_args(&request),
            vec![
                "buildx",
                "build",
                "--file",
                "/w/src/Dockerfile",
                "--tag",
                "acme/contours:latest",
                "--builder",
                "dockhand-abc",
                "--push",
                "/w/src/."
            ]
        );
    }

    #[test]
    fn test_build_args_without_push() {
        let request = BuildRequest {
            context: PathBuf::from("ctx"),
            descriptor: PathBuf::from("ctx/Dockerfile"),
            tag: ImageTag::parse("acme/app").unwrap(),
            platforms: vec!["linux/amd64".to_string()],
            push: false,
            builder: None,
        };
        let args = BuildxImageBuilder::build_args(&request);
        assert!(!args.contains(&"--push".to_string()));
        assert!(!args.contains(&"--builder".to_string()));
        assert!(args.contains(&"linux/amd64".to_string()));
    }
}
