use super::parsing::{
    env_optional, env_or_default, is_plain_extension, normalize_base_url, parse_bool,
    parse_cors_origins, parse_environment, parse_percent, parse_string_list, parse_u16, parse_u64,
    parse_usize,
};
use super::types::{
    ApiSettings, BackendSettings, ConfigError, CorsSettings, NotificationSettings, PenaltySettings,
    RedisSettings, RuntimeSettings, ServerHost, ServerPort, ServerSettings, Settings, TelemetrySettings,
    UploadSettings,
};

const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";
const DEFAULT_UPLOAD_EXTENSIONS: &[&str] =
    &["pdf", "zip", "docx", "odt", "txt", "png", "jpg", "jpeg"];

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("GRADING_DESK_HOST", "0.0.0.0");
        let port = env_or_default("GRADING_DESK_PORT", "8090");

        let environment = parse_environment(
            env_optional("GRADING_DESK_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("GRADING_DESK_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Grading Desk");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_prefix = env_or_default("API_PREFIX", "/api/v1");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let backend_url_raw = env_optional("BACKEND_API_URL");
        let backend_explicit = backend_url_raw.is_some();
        let backend_base_url = normalize_base_url(
            "BACKEND_API_URL",
            backend_url_raw.unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
        )?;
        let backend_timeout_seconds =
            parse_u64("BACKEND_TIMEOUT_SECONDS", env_or_default("BACKEND_TIMEOUT_SECONDS", "30"))?;
        let backend_connect_timeout_seconds = parse_u64(
            "BACKEND_CONNECT_TIMEOUT_SECONDS",
            env_or_default("BACKEND_CONNECT_TIMEOUT_SECONDS", "5"),
        )?;
        let backend_max_parallel_lookups = parse_usize(
            "BACKEND_MAX_PARALLEL_LOOKUPS",
            env_or_default("BACKEND_MAX_PARALLEL_LOOKUPS", "8"),
        )?;

        let max_upload_size_mb =
            parse_u64("MAX_UPLOAD_SIZE_MB", env_or_default("MAX_UPLOAD_SIZE_MB", "25"))?;
        let allowed_extensions = parse_string_list(
            env_optional("ALLOWED_UPLOAD_EXTENSIONS"),
            DEFAULT_UPLOAD_EXTENSIONS,
        );

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let read_ttl_days = parse_u64(
            "NOTIFICATION_READ_TTL_DAYS",
            env_or_default("NOTIFICATION_READ_TTL_DAYS", "90"),
        )?;

        let penalty_percent_per_day = parse_percent(
            "LATE_PENALTY_PERCENT_PER_DAY",
            env_or_default("LATE_PENALTY_PERCENT_PER_DAY", "0"),
        )?;
        let penalty_max_percent = parse_percent(
            "LATE_PENALTY_MAX_PERCENT",
            env_or_default("LATE_PENALTY_MAX_PERCENT", "100"),
        )?;
        let penalty_allow_after_hard = env_optional("LATE_PENALTY_ALLOW_AFTER_HARD")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);

        let log_level = env_or_default("GRADING_DESK_LOG_LEVEL", "info");
        let json = env_optional("GRADING_DESK_LOG_JSON")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);
        let prometheus_enabled = env_optional("PROMETHEUS_ENABLED")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_prefix },
            cors: CorsSettings { origins: cors_origins },
            backend: BackendSettings {
                base_url: backend_base_url,
                explicit: backend_explicit,
                timeout_seconds: backend_timeout_seconds,
                connect_timeout_seconds: backend_connect_timeout_seconds,
                max_parallel_lookups: backend_max_parallel_lookups,
            },
            uploads: UploadSettings { max_upload_size_mb, allowed_extensions },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            notifications: NotificationSettings { read_ttl_days },
            penalty: PenaltySettings {
                percent_per_day: penalty_percent_per_day,
                max_percent: penalty_max_percent,
                allow_after_hard: penalty_allow_after_hard,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn backend(&self) -> &BackendSettings {
        &self.backend
    }

    pub(crate) fn uploads(&self) -> &UploadSettings {
        &self.uploads
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn notifications(&self) -> &NotificationSettings {
        &self.notifications
    }

    pub(crate) fn penalty(&self) -> &PenaltySettings {
        &self.penalty
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.api.api_prefix.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "API_PREFIX",
                value: self.api.api_prefix.clone(),
            });
        }

        if self.backend.max_parallel_lookups == 0 {
            return Err(ConfigError::InvalidValue {
                field: "BACKEND_MAX_PARALLEL_LOOKUPS",
                value: String::from("0"),
            });
        }

        if self.uploads.max_upload_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_UPLOAD_SIZE_MB",
                value: String::from("0"),
            });
        }

        if self.uploads.allowed_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_UPLOAD_EXTENSIONS",
                value: String::from("<empty>"),
            });
        }
        for extension in &self.uploads.allowed_extensions {
            if !is_plain_extension(extension) {
                return Err(ConfigError::InvalidValue {
                    field: "ALLOWED_UPLOAD_EXTENSIONS",
                    value: extension.clone(),
                });
            }
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if !self.backend.explicit {
            return Err(ConfigError::MissingSetting("BACKEND_API_URL"));
        }

        Ok(())
    }
}
