//! Wire enumerations
//!
//! Every enumeration of the load balancer model is a Rust enum that
//! serializes with the upstream spelling. Parsing an unknown spelling
//! fails with a `Validation` error naming the enumeration.

/// Macro to generate an enum whose variants map to upstream strings
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $wire)] $variant),+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Upstream spelling
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::errors::CloudAvenueError;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err($crate::errors::CloudAvenueError::validation_field(
                        format!(
                            "'{}' is not one of [{}]",
                            other,
                            $name::ALL.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
                        ),
                        stringify!($name),
                    )),
                }
            }
        }
    };
}

pub(crate) use wire_enum;

wire_enum! {
    /// Pool load-balancing algorithm
    PoolAlgorithm {
        LeastConnections => "LEAST_CONNECTIONS",
        RoundRobin => "ROUND_ROBIN",
        ConsistentHash => "CONSISTENT_HASH",
        FastestResponse => "FASTEST_RESPONSE",
        LeastLoad => "LEAST_LOAD",
        FewestServers => "FEWEST_SERVERS",
        Random => "RANDOM",
        FewestTasks => "FEWEST_TASKS",
        CoreAffinity => "CORE_AFFINITY",
    }
}

wire_enum! {
    /// Active health monitor type
    HealthMonitorType {
        Http => "HTTP",
        Https => "HTTPS",
        Tcp => "TCP",
        Udp => "UDP",
        Ping => "PING",
    }
}

wire_enum! {
    /// Health reported for a pool member
    PoolMemberHealthStatus {
        Up => "UP",
        Down => "DOWN",
        Disabled => "DISABLED",
        Unknown => "UNKNOWN",
    }
}

wire_enum! {
    /// Pool persistence profile type
    PersistenceType {
        ClientIp => "CLIENT_IP",
        HttpCookie => "HTTP_COOKIE",
        CustomHttpHeader => "CUSTOM_HTTP_HEADER",
        AppCookie => "APP_COOKIE",
        Tls => "TLS",
    }
}

impl PersistenceType {
    /// Whether the profile needs a `value` (header or cookie name, TLS ticket key)
    pub fn requires_value(&self) -> bool {
        matches!(
            self,
            PersistenceType::CustomHttpHeader | PersistenceType::AppCookie | PersistenceType::Tls
        )
    }
}

wire_enum! {
    /// Virtual service application profile
    ApplicationProfileType {
        Http => "HTTP",
        Https => "HTTPS",
        L4Tcp => "L4_TCP",
        L4Udp => "L4_UDP",
        L4Tls => "L4_TLS",
    }
}

impl ApplicationProfileType {
    /// HTTPS and L4_TLS terminate TLS and need a certificate
    pub fn requires_certificate(&self) -> bool {
        matches!(self, ApplicationProfileType::Https | ApplicationProfileType::L4Tls)
    }
}

wire_enum! {
    /// Transport profile of a virtual service port
    TransportType {
        TcpProxy => "TCP_PROXY",
        TcpFastPath => "TCP_FAST_PATH",
        UdpFastPath => "UDP_FAST_PATH",
    }
}

wire_enum! {
    /// Health reported for a virtual service
    VirtualServiceHealthStatus {
        Up => "UP",
        Down => "DOWN",
        Running => "RUNNING",
        Unavailable => "UNAVAILABLE",
        Unknown => "UNKNOWN",
    }
}
