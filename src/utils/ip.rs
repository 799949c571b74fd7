//! IP 地址处理工具
//!
//! 客户端 IP 由服务端观测得出，请求体里自报的 IP 一律忽略。
//! 支持可信代理配置（单 IP 或 CIDR），来自可信代理的连接
//! 才会采信 X-Forwarded-For。

use std::net::{IpAddr, SocketAddr};

use actix_web::HttpRequest;

/// 检查 IP 是否在可信代理列表中
pub fn is_trusted_proxy(ip: &str, trusted_proxies: &[String]) -> bool {
    // 先尝试解析为 SocketAddr（支持 ip:port），失败再尝试纯 IpAddr
    let ip_addr = if let Ok(socket_addr) = ip.parse::<SocketAddr>() {
        socket_addr.ip()
    } else if let Ok(ip_addr) = ip.parse::<IpAddr>() {
        ip_addr
    } else {
        return false;
    };

    for proxy in trusted_proxies {
        if proxy.contains('/') {
            // CIDR 格式（如 "192.168.1.0/24"）
            if ip_in_cidr(&ip_addr, proxy) {
                return true;
            }
        } else {
            // 单 IP
            if let Ok(proxy_addr) = proxy.parse::<IpAddr>()
                && ip_addr == proxy_addr
            {
                return true;
            }
        }
    }
    false
}

/// CIDR 检查
pub fn ip_in_cidr(ip: &IpAddr, cidr: &str) -> bool {
    let Some((network, prefix_len)) = cidr.split_once('/') else {
        return false;
    };

    let Ok(prefix_len): Result<u8, _> = prefix_len.parse() else {
        return false;
    };

    let Ok(network_addr) = network.parse::<IpAddr>() else {
        return false;
    };

    match (ip, network_addr) {
        (IpAddr::V4(ip), IpAddr::V4(net)) => {
            if prefix_len > 32 {
                return false;
            }
            let mask = u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0);
            let ip_bits = u32::from_be_bytes(ip.octets());
            let net_bits = u32::from_be_bytes(net.octets());
            (ip_bits & mask) == (net_bits & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) => {
            if prefix_len > 128 {
                return false;
            }
            let mask = u128::MAX.checked_shl(128 - prefix_len as u32).unwrap_or(0);
            let ip_bits = u128::from_be_bytes(ip.octets());
            let net_bits = u128::from_be_bytes(net.octets());
            (ip_bits & mask) == (net_bits & mask)
        }
        _ => false, // IPv4 vs IPv6 不匹配
    }
}

/// 提取客户端真实 IP
///
/// 策略：
/// - 默认使用连接 IP（TCP peer address，无法伪造）
/// - 连接来自可信代理时采信 X-Forwarded-For / X-Real-IP
pub fn extract_client_ip(req: &HttpRequest, trusted_proxies: &[String]) -> String {
    let conn_info = req.connection_info();

    let Some(peer_ip) = conn_info.peer_addr() else {
        return "unknown".to_string();
    };

    if !trusted_proxies.is_empty() && is_trusted_proxy(peer_ip, trusted_proxies) {
        conn_info
            .realip_remote_addr()
            .unwrap_or(peer_ip)
            .to_string()
    } else {
        strip_port(peer_ip)
    }
}

/// 去掉 ip:port 形式中的端口部分
fn strip_port(addr: &str) -> String {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        socket_addr.ip().to_string()
    } else {
        addr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_ip_match() {
        let proxies = vec!["10.0.0.1".to_string()];
        assert!(is_trusted_proxy("10.0.0.1", &proxies));
        assert!(is_trusted_proxy("10.0.0.1:8443", &proxies));
        assert!(!is_trusted_proxy("10.0.0.2", &proxies));
    }

    #[test]
    fn test_cidr_match() {
        let proxies = vec!["192.168.1.0/24".to_string()];
        assert!(is_trusted_proxy("192.168.1.55", &proxies));
        assert!(!is_trusted_proxy("192.168.2.55", &proxies));
    }

    #[test]
    fn test_ipv6_cidr_match() {
        let proxies = vec!["fd00::/8".to_string()];
        let ip: IpAddr = "fd12::1".parse().unwrap();
        assert!(ip_in_cidr(&ip, "fd00::/8"));
        let outside: IpAddr = "fe80::1".parse().unwrap();
        assert!(!ip_in_cidr(&outside, "fd00::/8"));
    }

    #[test]
    fn test_invalid_cidr_never_matches() {
        let ip: IpAddr = "192.168.1.1".parse().unwrap();
        assert!(!ip_in_cidr(&ip, "192.168.1.0/99"));
        assert!(!ip_in_cidr(&ip, "not-a-network/24"));
        assert!(!ip_in_cidr(&ip, "192.168.1.0"));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("1.2.3.4:5678"), "1.2.3.4");
        assert_eq!(strip_port("1.2.3.4"), "1.2.3.4");
    }
}
